//! Remediation control plane commands

use clap::Subcommand;
use planectl_watch::reconcile::RemediationReconciler;
use serde_json::{Map, Value, json};

use crate::display::{cell, objects, print_json, render_table};
use crate::error::Result;

use super::{Context, param, parse_json_flag, run_stream};

#[derive(Subcommand)]
pub enum RemediationCommands {
    /// Manage remediation playbooks
    Playbooks {
        #[command(subcommand)]
        command: PlaybookCommands,
    },

    /// Inspect remediation runs
    Runs {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// Stream remediation events
    Watch {
        #[arg(long)]
        run_id: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum PlaybookCommands {
    /// List remediation playbooks
    List,
}

#[derive(Subcommand)]
pub enum RunCommands {
    /// List remediation runs
    List {
        #[arg(long = "instance-id")]
        instance_id: Option<i64>,
        #[arg(long)]
        status: Option<String>,
    },

    /// Show remediation run details
    Get { run_id: i64 },

    /// Enqueue a remediation run for a VM instance
    Enqueue {
        instance_id: i64,
        /// Playbook key to execute
        playbook: String,
        /// Run metadata as JSON
        #[arg(long)]
        metadata: Option<String>,
        /// Automation payload as JSON
        #[arg(long = "payload")]
        automation_payload: Option<String>,
        #[arg(long = "owner")]
        assigned_owner_id: Option<i64>,
    },

    /// Update remediation run approval state
    Approve {
        run_id: i64,
        #[arg(long = "state")]
        new_state: String,
        #[arg(long = "notes")]
        approval_notes: Option<String>,
        /// Optimistic concurrency guard
        #[arg(long = "version")]
        expected_version: i64,
    },

    /// List remediation artifacts for a run
    Artifacts { run_id: i64 },
}

pub async fn run(ctx: &Context, command: RemediationCommands) -> Result<()> {
    match command {
        RemediationCommands::Playbooks {
            command: PlaybookCommands::List,
        } => playbooks_list(ctx).await,
        RemediationCommands::Runs { command } => match command {
            RunCommands::List {
                instance_id,
                status,
            } => runs_list(ctx, instance_id, status).await,
            RunCommands::Get { run_id } => runs_get(ctx, run_id).await,
            RunCommands::Enqueue {
                instance_id,
                playbook,
                metadata,
                automation_payload,
                assigned_owner_id,
            } => {
                runs_enqueue(
                    ctx,
                    instance_id,
                    playbook,
                    metadata,
                    automation_payload,
                    assigned_owner_id,
                )
                .await
            }
            RunCommands::Approve {
                run_id,
                new_state,
                approval_notes,
                expected_version,
            } => runs_approve(ctx, run_id, new_state, approval_notes, expected_version).await,
            RunCommands::Artifacts { run_id } => runs_artifacts(ctx, run_id).await,
        },
        RemediationCommands::Watch { run_id } => {
            let mut params = Vec::new();
            param(&mut params, "run_id", run_id);
            run_stream(
                ctx,
                "/api/trust/remediation/stream",
                params,
                RemediationReconciler::new(),
                None,
            )
            .await
        }
    }
}

async fn playbooks_list(ctx: &Context) -> Result<()> {
    let records = ctx
        .client
        .get("/api/trust/remediation/playbooks", &Vec::new())
        .await?;
    if ctx.json {
        print_json(&records);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = objects(&records)
        .map(|item| {
            vec![
                cell(item.get("id")),
                cell(item.get("playbook_key")),
                cell(item.get("executor_type")),
                cell(item.get("approval_required")),
                cell(item.get("sla_duration_seconds")),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["id", "key", "executor", "approval", "sla"], &rows)
    );
    Ok(())
}

async fn runs_list(ctx: &Context, instance_id: Option<i64>, status: Option<String>) -> Result<()> {
    let mut params = Vec::new();
    param(&mut params, "runtime_vm_instance_id", instance_id);
    param(&mut params, "status", status);
    let records = ctx
        .client
        .get("/api/trust/remediation/runs", &params)
        .await?;
    if ctx.json {
        print_json(&records);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = objects(&records)
        .map(|item| {
            vec![
                cell(item.get("id")),
                cell(item.get("runtime_vm_instance_id")),
                cell(item.get("playbook")),
                cell(item.get("status")),
                cell(item.get("approval_state")),
                cell(item.get("assigned_owner_id")),
                cell(item.get("sla_deadline")),
                cell(item.get("updated_at")),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &["id", "instance", "playbook", "status", "approval", "owner", "sla_deadline", "updated_at"],
            &rows,
        )
    );
    Ok(())
}

async fn runs_get(ctx: &Context, run_id: i64) -> Result<()> {
    let run = ctx
        .client
        .get(&format!("/api/trust/remediation/runs/{run_id}"), &Vec::new())
        .await?;
    if ctx.json {
        print_json(&run);
        return Ok(());
    }
    print_run(&run);
    Ok(())
}

fn print_run(run: &Value) {
    let columns = [
        "id",
        "runtime_vm_instance_id",
        "playbook",
        "status",
        "approval_state",
        "assigned_owner_id",
        "sla_deadline",
        "started_at",
        "completed_at",
        "failure_reason",
        "updated_at",
    ];
    let row: Vec<String> = columns.iter().map(|key| cell(run.get(key))).collect();
    println!("{}", render_table(&columns, &[row]));
}

async fn runs_enqueue(
    ctx: &Context,
    instance_id: i64,
    playbook: String,
    metadata: Option<String>,
    automation_payload: Option<String>,
    assigned_owner_id: Option<i64>,
) -> Result<()> {
    let mut payload = Map::new();
    payload.insert("runtime_vm_instance_id".into(), json!(instance_id));
    payload.insert("playbook".into(), json!(playbook));
    payload.insert(
        "metadata".into(),
        match metadata {
            Some(metadata) => parse_json_flag(&metadata, "--metadata")?,
            None => json!({}),
        },
    );
    if let Some(automation_payload) = automation_payload {
        payload.insert(
            "automation_payload".into(),
            parse_json_flag(&automation_payload, "--payload")?,
        );
    }
    if let Some(owner) = assigned_owner_id {
        payload.insert("assigned_owner_id".into(), json!(owner));
    }

    let response = ctx
        .client
        .post("/api/trust/remediation/runs", Some(&Value::Object(payload)))
        .await?;
    if ctx.json {
        print_json(&response);
        return Ok(());
    }
    match response.get("run").filter(|r| r.is_object()) {
        Some(run) => print_run(run),
        None => println!("Remediation run enqueued"),
    }
    Ok(())
}

async fn runs_approve(
    ctx: &Context,
    run_id: i64,
    new_state: String,
    approval_notes: Option<String>,
    expected_version: i64,
) -> Result<()> {
    let mut payload = Map::new();
    payload.insert("new_state".into(), json!(new_state));
    payload.insert("expected_version".into(), json!(expected_version));
    if let Some(notes) = approval_notes {
        payload.insert("approval_notes".into(), json!(notes));
    }

    let result = ctx
        .client
        .post(
            &format!("/api/trust/remediation/runs/{run_id}/approval"),
            Some(&Value::Object(payload)),
        )
        .await?;
    if ctx.json {
        print_json(&result);
        return Ok(());
    }
    let columns = ["id", "approval_state", "approval_decided_at", "approval_notes"];
    let row: Vec<String> = columns.iter().map(|key| cell(result.get(key))).collect();
    println!("{}", render_table(&columns, &[row]));
    Ok(())
}

async fn runs_artifacts(ctx: &Context, run_id: i64) -> Result<()> {
    let artifacts = ctx
        .client
        .get(
            &format!("/api/trust/remediation/runs/{run_id}/artifacts"),
            &Vec::new(),
        )
        .await?;
    if ctx.json {
        print_json(&artifacts);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = objects(&artifacts)
        .map(|item| {
            vec![
                cell(item.get("id")),
                cell(item.get("artifact_type")),
                cell(item.get("uri")),
                cell(item.get("created_at")),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["id", "type", "uri", "created_at"], &rows)
    );
    Ok(())
}
