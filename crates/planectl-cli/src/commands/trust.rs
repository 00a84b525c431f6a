//! Trust registry control plane commands

use clap::Subcommand;
use planectl_watch::reconcile::TrustReconciler;
use serde_json::{Map, Value, json};

use crate::display::{cell, cell_or, objects, print_json, render_table};
use crate::error::Result;

use super::{Context, param, parse_json_flag, run_stream};

#[derive(Subcommand)]
pub enum TrustCommands {
    /// List runtime VM trust registry entries
    Registry {
        #[arg(long)]
        server_id: Option<i64>,
        /// Filter by lifecycle state
        #[arg(long = "lifecycle")]
        lifecycle_state: Option<String>,
        /// Filter by attestation status
        #[arg(long = "status")]
        attestation_status: Option<String>,
        /// Only stale entries
        #[arg(long, conflicts_with = "fresh")]
        stale: bool,
        /// Only fresh entries
        #[arg(long)]
        fresh: bool,
    },

    /// Fetch trust registry state for a VM instance
    Get { vm_instance_id: i64 },

    /// Show lifecycle history for a VM instance
    History {
        vm_instance_id: i64,
        #[arg(long, default_value_t = 25)]
        limit: u32,
    },

    /// Apply a registry transition for a VM instance
    Transition {
        vm_instance_id: i64,
        #[arg(long = "status")]
        attestation_status: String,
        #[arg(long = "lifecycle")]
        lifecycle_state: String,
        #[arg(long)]
        remediation_state: Option<String>,
        #[arg(long)]
        remediation_attempts: Option<i64>,
        #[arg(long)]
        freshness_deadline: Option<String>,
        #[arg(long)]
        provenance_ref: Option<String>,
        /// Provenance payload as JSON
        #[arg(long)]
        provenance: Option<String>,
        /// Additional metadata as JSON
        #[arg(long)]
        metadata: Option<String>,
        #[arg(long = "reason")]
        transition_reason: Option<String>,
        /// Optimistic concurrency guard
        #[arg(long)]
        expected_version: Option<i64>,
    },

    /// Stream live trust registry transitions
    Watch {
        #[arg(long)]
        server_id: Option<i64>,
        #[arg(long = "lifecycle")]
        lifecycle_state: Option<String>,
        #[arg(long = "status")]
        attestation_status: Option<String>,
    },
}

pub async fn run(ctx: &Context, command: TrustCommands) -> Result<()> {
    match command {
        TrustCommands::Registry {
            server_id,
            lifecycle_state,
            attestation_status,
            stale,
            fresh,
        } => {
            registry(
                ctx,
                server_id,
                lifecycle_state,
                attestation_status,
                stale_filter(stale, fresh),
            )
            .await
        }
        TrustCommands::Get { vm_instance_id } => get(ctx, vm_instance_id).await,
        TrustCommands::History {
            vm_instance_id,
            limit,
        } => history(ctx, vm_instance_id, limit).await,
        TrustCommands::Transition {
            vm_instance_id,
            attestation_status,
            lifecycle_state,
            remediation_state,
            remediation_attempts,
            freshness_deadline,
            provenance_ref,
            provenance,
            metadata,
            transition_reason,
            expected_version,
        } => {
            let mut payload = Map::new();
            payload.insert("attestation_status".into(), json!(attestation_status));
            payload.insert("lifecycle_state".into(), json!(lifecycle_state));
            if let Some(state) = remediation_state {
                payload.insert("remediation_state".into(), json!(state));
            }
            if let Some(attempts) = remediation_attempts {
                payload.insert("remediation_attempts".into(), json!(attempts));
            }
            if let Some(deadline) = freshness_deadline {
                payload.insert("freshness_deadline".into(), json!(deadline));
            }
            if let Some(provenance_ref) = provenance_ref {
                payload.insert("provenance_ref".into(), json!(provenance_ref));
            }
            if let Some(reason) = transition_reason {
                payload.insert("transition_reason".into(), json!(reason));
            }
            if let Some(version) = expected_version {
                payload.insert("expected_version".into(), json!(version));
            }
            if let Some(provenance) = provenance {
                payload.insert(
                    "provenance".into(),
                    parse_json_flag(&provenance, "--provenance")?,
                );
            }
            if let Some(metadata) = metadata {
                payload.insert("metadata".into(), parse_json_flag(&metadata, "--metadata")?);
            }
            transition(ctx, vm_instance_id, Value::Object(payload)).await
        }
        TrustCommands::Watch {
            server_id,
            lifecycle_state,
            attestation_status,
        } => {
            let mut params = Vec::new();
            param(&mut params, "server_id", server_id);
            param(&mut params, "lifecycle_state", lifecycle_state);
            param(&mut params, "attestation_status", attestation_status);
            run_stream(
                ctx,
                "/api/trust/registry/stream",
                params,
                TrustReconciler::new(),
                None,
            )
            .await
        }
    }
}

fn stale_filter(stale: bool, fresh: bool) -> Option<bool> {
    match (stale, fresh) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

async fn registry(
    ctx: &Context,
    server_id: Option<i64>,
    lifecycle_state: Option<String>,
    attestation_status: Option<String>,
    stale: Option<bool>,
) -> Result<()> {
    let mut params = Vec::new();
    param(&mut params, "server_id", server_id);
    param(&mut params, "lifecycle_state", lifecycle_state);
    param(&mut params, "attestation_status", attestation_status);
    param(&mut params, "stale", stale);

    let entries = ctx.client.get("/api/trust/registry", &params).await?;
    if ctx.json {
        print_json(&entries);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = objects(&entries)
        .map(|entry| {
            vec![
                format!(
                    "{} ({})",
                    cell_or(entry.get("server_name"), "unknown"),
                    cell(entry.get("server_id")),
                ),
                cell(entry.get("instance_id")),
                cell(entry.get("attestation_status")),
                cell(entry.get("lifecycle_state")),
                cell_or(entry.get("remediation_state"), "-"),
                cell(entry.get("remediation_attempts")),
                if entry.get("stale").and_then(Value::as_bool).unwrap_or(false) {
                    "yes".to_string()
                } else {
                    String::new()
                },
                cell(entry.get("updated_at")),
            ]
        })
        .collect();
    if rows.is_empty() {
        println!("No trust registry entries found");
        return Ok(());
    }
    println!(
        "{}",
        render_table(
            &["server", "instance", "status", "lifecycle", "remediation", "attempts", "stale", "updated"],
            &rows,
        )
    );
    Ok(())
}

async fn get(ctx: &Context, vm_instance_id: i64) -> Result<()> {
    let state = ctx
        .client
        .get(&format!("/api/trust/registry/{vm_instance_id}"), &Vec::new())
        .await?;
    if ctx.json {
        print_json(&state);
        return Ok(());
    }
    print_registry_state(&state);
    Ok(())
}

fn print_registry_state(state: &Value) {
    println!(
        "Server: {} ({})",
        cell_or(state.get("server_name"), "unknown"),
        cell(state.get("server_id")),
    );
    println!(
        "VM Instance: {} ({})",
        cell(state.get("instance_id")),
        cell(state.get("vm_instance_id")),
    );
    println!("Attestation: {}", cell(state.get("attestation_status")));
    println!("Lifecycle: {}", cell(state.get("lifecycle_state")));
    println!(
        "Remediation: {} (attempts {})",
        cell_or(state.get("remediation_state"), "-"),
        cell(state.get("remediation_attempts")),
    );
    println!(
        "Freshness deadline: {}",
        cell_or(state.get("freshness_deadline"), "unset"),
    );
    println!(
        "Provenance ref: {}",
        cell_or(state.get("provenance_ref"), "-"),
    );
    println!(
        "Version: {} (updated {})",
        cell(state.get("version")),
        cell(state.get("updated_at")),
    );
}

async fn history(ctx: &Context, vm_instance_id: i64, limit: u32) -> Result<()> {
    let mut params = Vec::new();
    param(&mut params, "limit", Some(limit));
    let history = ctx
        .client
        .get(
            &format!("/api/trust/registry/{vm_instance_id}/history"),
            &params,
        )
        .await?;
    if ctx.json {
        print_json(&history);
        return Ok(());
    }

    println!(
        "Server {} ({}) instance {}",
        cell(history.get("server_name")),
        cell(history.get("server_id")),
        cell(history.get("instance_id")),
    );
    let rows: Vec<Vec<String>> = history
        .get("events")
        .map(objects)
        .into_iter()
        .flatten()
        .map(|event| {
            vec![
                cell(event.get("triggered_at")),
                cell(event.get("current_status")),
                cell(event.get("current_lifecycle_state")),
                cell_or(event.get("remediation_state"), "-"),
                cell(event.get("remediation_attempts")),
                cell_or(event.get("transition_reason"), "-"),
            ]
        })
        .collect();
    if rows.is_empty() {
        println!("No trust transitions recorded");
        return Ok(());
    }
    println!(
        "{}",
        render_table(
            &["triggered", "status", "lifecycle", "remediation", "attempts", "reason"],
            &rows,
        )
    );
    Ok(())
}

async fn transition(ctx: &Context, vm_instance_id: i64, payload: Value) -> Result<()> {
    let result = ctx
        .client
        .post(
            &format!("/api/trust/registry/{vm_instance_id}/transition"),
            Some(&payload),
        )
        .await?;
    if ctx.json {
        print_json(&result);
        return Ok(());
    }
    println!("Transition applied");
    get(ctx, vm_instance_id).await
}
