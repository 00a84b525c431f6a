//! Runtime policy insight commands

use clap::Subcommand;
use planectl_watch::reconcile::PolicyReconciler;

use crate::display::{cell, cell_or, objects, print_json, render_table};
use crate::error::Result;

use super::{Context, param, run_stream};

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Show capability intelligence scores for a server
    Intelligence { server_id: i64 },

    /// Inspect virtual machine attestation posture for a server
    Vm { server_id: i64 },

    /// Stream runtime policy and attestation updates in real time
    Watch {
        /// Restrict the stream to a specific server identifier
        #[arg(long)]
        server_id: Option<i64>,
    },
}

pub async fn run(ctx: &Context, command: PolicyCommands) -> Result<()> {
    match command {
        PolicyCommands::Intelligence { server_id } => intelligence(ctx, server_id).await,
        PolicyCommands::Vm { server_id } => vm(ctx, server_id).await,
        PolicyCommands::Watch { server_id } => {
            let mut params = Vec::new();
            param(&mut params, "server_id", server_id);
            run_stream(
                ctx,
                "/api/policy/stream",
                params,
                PolicyReconciler::new(ctx.use_color()),
                None,
            )
            .await
        }
    }
}

async fn intelligence(ctx: &Context, server_id: i64) -> Result<()> {
    let scores = ctx
        .client
        .get(
            &format!("/api/intelligence/servers/{server_id}/scores"),
            &Vec::new(),
        )
        .await?;
    if ctx.json {
        print_json(&scores);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = objects(&scores)
        .map(|entry| {
            let score = entry
                .get("score")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0);
            let notes: Vec<&str> = entry
                .get("notes")
                .and_then(serde_json::Value::as_array)
                .map(|a| a.iter().filter_map(serde_json::Value::as_str).take(3).collect())
                .unwrap_or_default();
            vec![
                cell(entry.get("capability")),
                format!("{score:.1}"),
                cell(entry.get("status")),
                cell_or(entry.get("backend"), "-"),
                cell_or(entry.get("tier"), "-"),
                cell(entry.get("last_observed_at")),
                notes.join("; "),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &["capability", "score", "status", "backend", "tier", "observed_at", "notes"],
            &rows,
        )
    );
    Ok(())
}

async fn vm(ctx: &Context, server_id: i64) -> Result<()> {
    let summary = ctx
        .client
        .get(&format!("/api/servers/{server_id}/vm"), &Vec::new())
        .await?;
    if ctx.json {
        print_json(&summary);
        return Ok(());
    }

    let instances: Vec<&serde_json::Value> = summary
        .get("instances")
        .map(objects)
        .into_iter()
        .flatten()
        .collect();
    if instances.is_empty() {
        println!("No VM instances recorded for this server");
        return Ok(());
    }

    let active = summary
        .get("active_instance_id")
        .and_then(serde_json::Value::as_str);
    let rows: Vec<Vec<String>> = instances
        .iter()
        .map(|entry| {
            let instance_id = entry.get("instance_id").and_then(serde_json::Value::as_str);
            vec![
                cell(entry.get("instance_id")),
                cell(entry.get("attestation_status")),
                cell_or(entry.get("isolation_tier"), "-"),
                cell(entry.get("updated_at")),
                if active.is_some() && instance_id == active {
                    "yes".to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["instance", "status", "tier", "updated", "active"], &rows)
    );

    println!(
        "Latest posture: {} (updated {})",
        cell_or(summary.get("latest_status"), "unknown"),
        cell_or(summary.get("last_updated_at"), "unknown"),
    );
    if let Some(active) = active {
        println!("Active instance: {active}");
    }
    Ok(())
}
