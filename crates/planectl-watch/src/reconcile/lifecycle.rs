//! Lifecycle console stream reconciler
//!
//! The server already computes snapshot deltas per cursor, so this
//! reconciler keeps no state of its own. Heartbeats and errors become
//! one line, snapshot pages become per-workspace blocks with the
//! promotion and remediation tables, and deltas become one line per
//! changed run, promotion run or promotion posture.

use serde_json::Value;

use crate::event::LifecycleEvent;
use crate::render::{literal, render_table, summarize_json};

use super::Reconciler;

/// Stateless renderer for `/api/console/lifecycle/stream`.
#[derive(Debug, Default)]
pub struct LifecycleReconciler;

impl LifecycleReconciler {
    pub fn new() -> Self {
        Self
    }
}

impl Reconciler for LifecycleReconciler {
    fn apply(&mut self, event: &Value) -> Vec<String> {
        let Some(event) = LifecycleEvent::from_value(event) else {
            return Vec::new();
        };

        let emitted = event.emitted_at.as_deref().unwrap_or("?");
        let cursor = event
            .cursor
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| "null".to_string());

        match event.kind.as_deref() {
            Some("heartbeat") => {
                return vec![format!("[{emitted}] lifecycle heartbeat (cursor={cursor})")];
            }
            Some("error") => {
                let error = event.error.as_deref().unwrap_or("unknown");
                return vec![format!("[{emitted}] lifecycle error: {error}")];
            }
            _ => {}
        }

        let mut lines = Vec::new();
        if let Some(page) = &event.page {
            lines.push(format!("[{emitted}] lifecycle snapshot (cursor={cursor})"));
            lines.extend(render_page(page));
        }
        if let Some(delta) = &event.delta {
            lines.extend(render_delta(delta));
        }
        lines
    }
}

/// Render a snapshot page for streaming and one-shot listings alike.
pub fn render_page(page: &Value) -> Vec<String> {
    let Some(workspaces) = page.get("workspaces").and_then(Value::as_array) else {
        return vec!["No lifecycle workspaces available".to_string()];
    };
    let mut lines = Vec::new();
    for snapshot in workspaces.iter().filter(|s| s.is_object()) {
        lines.extend(render_workspace(snapshot));
    }
    lines
}

fn render_workspace(snapshot: &Value) -> Vec<String> {
    let Some(workspace) = snapshot.get("workspace").filter(|w| w.is_object()) else {
        return Vec::new();
    };
    let mut lines = vec![format!(
        "workspace {} ({}) state={} owner={} name={}",
        scalar(workspace.get("id")),
        scalar(workspace.get("workspace_key")),
        scalar(workspace.get("lifecycle_state")),
        scalar(workspace.get("owner_id")),
        scalar(workspace.get("display_name")),
    )];

    let promotion_rows: Vec<Vec<String>> = objects(snapshot.get("promotion_runs"))
        .map(|item| {
            let gate_context = item.get("promotion_gate_context").filter(|g| g.is_object());
            vec![
                scalar(item.get("id")),
                scalar(item.get("status")),
                scalar(item.get("playbook")),
                extract_string(gate_context, &["lane", "promotion_lane"]),
                extract_string(gate_context, &["stage", "promotion_stage"]),
                summarize_json(item.get("automation_payload"), 64),
                summarize_json(item.get("metadata"), 64),
            ]
        })
        .collect();
    if !promotion_rows.is_empty() {
        lines.push("Promotion automation runs:".to_string());
        lines.push(render_table(
            &["id", "status", "playbook", "lane", "stage", "payload", "metadata"],
            &promotion_rows,
        ));
    }

    let posture_rows: Vec<Vec<String>> = objects(snapshot.get("promotion_postures"))
        .map(|posture| {
            vec![
                scalar(posture.get("promotion_id")),
                scalar(posture.get("stage")),
                scalar(posture.get("track_name")),
                scalar(posture.get("track_tier")),
                scalar(posture.get("status")),
                yes_no(posture.get("allowed")),
                scalar(posture.get("updated_at")),
            ]
        })
        .collect();
    if !posture_rows.is_empty() {
        lines.push("Promotion posture verdicts:".to_string());
        lines.push(render_table(
            &["promotion", "stage", "track", "tier", "status", "allowed", "updated"],
            &posture_rows,
        ));
    }

    let run_rows: Vec<Vec<String>> = objects(snapshot.get("recent_runs"))
        .map(|run| {
            let body = run.get("run").filter(|r| r.is_object());
            vec![
                scalar(body.and_then(|b| b.get("id"))),
                scalar(body.and_then(|b| b.get("status"))),
                scalar(body.and_then(|b| b.get("playbook"))),
                summarize_attempt(run.get("retry_attempt"), run.get("retry_limit")),
                summarize_duration(run.get("duration_seconds")),
                run.get("override_reason")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("-")
                    .to_string(),
                summarize_trust(run.get("trust")),
                summarize_marketplace(run.get("marketplace")),
                summarize_artifacts(run.get("artifacts")),
            ]
        })
        .collect();
    if !run_rows.is_empty() {
        lines.push("Recent remediation runs:".to_string());
        lines.push(render_table(
            &["id", "status", "playbook", "attempt", "duration", "override", "trust", "market", "artifacts"],
            &run_rows,
        ));
    }

    lines.push(String::new());
    lines
}

fn render_delta(delta: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    for workspace_delta in objects(delta.get("workspaces")) {
        let workspace_id = scalar(workspace_delta.get("workspace_id"));

        for run_delta in objects(workspace_delta.get("run_deltas")) {
            let changes = summarize_field_changes(
                run_delta,
                &[
                    "trust_changes",
                    "intelligence_changes",
                    "marketplace_changes",
                    "analytics_changes",
                    "artifact_changes",
                ],
            );
            lines.push(format!(
                "workspace {workspace_id} run {} -> status={}{changes}",
                scalar(run_delta.get("run_id")),
                scalar(run_delta.get("status")),
            ));
        }
        for run_id in ids(workspace_delta.get("removed_run_ids")) {
            lines.push(format!("workspace {workspace_id} run {run_id} removed"));
        }

        for run_delta in objects(workspace_delta.get("promotion_run_deltas")) {
            let changes = summarize_field_changes(
                run_delta,
                &[
                    "automation_payload_changes",
                    "gate_context_changes",
                    "metadata_changes",
                    "analytics_changes",
                    "artifact_changes",
                ],
            );
            lines.push(format!(
                "workspace {workspace_id} promotion-run {} -> status={}{changes}",
                scalar(run_delta.get("run_id")),
                scalar(run_delta.get("status")),
            ));
        }
        for run_id in ids(workspace_delta.get("removed_promotion_run_ids")) {
            lines.push(format!(
                "workspace {workspace_id} promotion-run {run_id} removed"
            ));
        }

        for posture in objects(workspace_delta.get("promotion_posture_deltas")) {
            lines.push(render_posture_delta(&workspace_id, posture));
        }
        for promotion_id in ids(workspace_delta.get("removed_promotion_ids")) {
            lines.push(format!(
                "workspace {workspace_id} promotion {promotion_id} removed"
            ));
        }
    }
    lines
}

fn render_posture_delta(workspace_id: &str, posture: &Value) -> String {
    let mut details: Vec<String> = Vec::new();
    for (label, key) in [("stage", "stage"), ("track", "track_name"), ("tier", "track_tier")] {
        if let Some(value) = posture.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()) {
            details.push(format!("{label}={value}"));
        }
    }
    for (label, key) in [
        ("veto", "veto_reasons"),
        ("notes", "notes"),
        ("hooks", "remediation_hooks"),
    ] {
        let rendered = strings(posture.get(key)).collect::<Vec<_>>().join(", ");
        if !rendered.is_empty() {
            details.push(format!("{label}=[{rendered}]"));
        }
    }
    if let Some(signals) = posture.get("signals").filter(|s| !s.is_null()) {
        details.push(format!("signals={}", summarize_json(Some(signals), 64)));
    }
    let allowed = yes_no(posture.get("allowed"));
    let suffix = if details.is_empty() {
        String::new()
    } else {
        format!(" {}", details.join(" "))
    };
    format!(
        "workspace {workspace_id} promotion {} -> status={} allowed={allowed}{suffix}",
        scalar(posture.get("promotion_id")),
        scalar(posture.get("status")),
    )
}

fn summarize_field_changes(run_delta: &Value, keys: &[&str]) -> String {
    let mut summaries = String::new();
    for key in keys {
        let rendered: Vec<String> = objects(run_delta.get(key))
            .map(|change| {
                let field = scalar(change.get("field"));
                let current = change
                    .get("current")
                    .map(literal)
                    .unwrap_or_else(|| "null".to_string());
                match change.get("previous").filter(|p| !p.is_null()) {
                    Some(previous) => {
                        format!("{field}={current} (was {})", literal(previous))
                    }
                    None => format!("{field}={current}"),
                }
            })
            .collect();
        if !rendered.is_empty() {
            summaries.push_str(&format!(" {key} -> {}", rendered.join(", ")));
        }
    }
    summaries
}

fn summarize_trust(value: Option<&Value>) -> String {
    let Some(value) = value.filter(|v| v.is_object()) else {
        return "-".to_string();
    };
    let lifecycle = value.get("lifecycle_state").and_then(Value::as_str);
    let status = value
        .get("attestation_status")
        .and_then(Value::as_str)
        .or(lifecycle);
    match (status, lifecycle) {
        (Some(status), Some(lifecycle)) => format!("{status}/{lifecycle}"),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => "-".to_string(),
    }
}

fn summarize_marketplace(value: Option<&Value>) -> String {
    let Some(value) = value.filter(|v| v.is_object()) else {
        return "-".to_string();
    };
    let status = value.get("status").and_then(Value::as_str);
    let completed = value.get("last_completed_at").and_then(Value::as_str);
    match (status, completed) {
        (Some(status), Some(completed)) => format!("{status} @ {completed}"),
        (Some(status), None) => status.to_string(),
        _ => "-".to_string(),
    }
}

fn summarize_duration(value: Option<&Value>) -> String {
    match value.and_then(Value::as_f64) {
        Some(seconds) => format!("{}s", seconds as i64),
        None => "-".to_string(),
    }
}

fn summarize_attempt(attempt: Option<&Value>, retry_limit: Option<&Value>) -> String {
    let attempt = attempt.and_then(Value::as_f64).map(|v| v as i64);
    let limit = retry_limit.and_then(Value::as_f64).map(|v| v as i64);
    match (attempt, limit) {
        (None, None) => "-".to_string(),
        (Some(attempt), None) => attempt.to_string(),
        (None, Some(limit)) => format!("-/{limit}"),
        (Some(attempt), Some(limit)) => format!("{attempt}/{limit}"),
    }
}

fn summarize_artifacts(value: Option<&Value>) -> String {
    let entries: Vec<String> = objects(value)
        .map(|artifact| {
            let mut summary = artifact
                .get("manifest_digest")
                .and_then(Value::as_str)
                .unwrap_or("artifact")
                .to_string();
            let mut details = Vec::new();
            for (label, key) in [("lane", "lane"), ("stage", "stage"), ("tag", "manifest_tag")] {
                if let Some(value) =
                    artifact.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
                {
                    details.push(format!("{label}={value}"));
                }
            }
            if !details.is_empty() {
                summary = format!("{summary} ({})", details.join(", "));
            }
            summary
        })
        .collect();
    if entries.is_empty() {
        "-".to_string()
    } else {
        entries.join("; ")
    }
}

fn extract_string(data: Option<&Value>, keys: &[&str]) -> String {
    data.and_then(|d| {
        keys.iter()
            .find_map(|key| d.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()))
    })
    .unwrap_or("-")
    .to_string()
}

fn scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn yes_no(value: Option<&Value>) -> String {
    if value.and_then(Value::as_bool).unwrap_or(false) {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter(|entry| entry.is_object())
}

fn ids(value: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
        .map(|id| scalar(Some(id)))
}

fn strings(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn heartbeat_becomes_one_line() {
        let mut reconciler = LifecycleReconciler::new();
        let lines = reconciler.apply(&json!({
            "type": "heartbeat",
            "cursor": 42,
            "emitted_at": "2026-08-25T10:00:00Z",
        }));
        assert_eq!(
            lines,
            vec!["[2026-08-25T10:00:00Z] lifecycle heartbeat (cursor=42)".to_string()]
        );
    }

    #[test]
    fn error_event_surfaces_the_message() {
        let mut reconciler = LifecycleReconciler::new();
        let lines = reconciler.apply(&json!({
            "type": "error",
            "emitted_at": "t1",
            "error": "cursor expired",
        }));
        assert_eq!(lines, vec!["[t1] lifecycle error: cursor expired".to_string()]);
    }

    #[test]
    fn snapshot_renders_workspace_header_and_tables() {
        let mut reconciler = LifecycleReconciler::new();
        let lines = reconciler.apply(&json!({
            "type": "snapshot",
            "cursor": 7,
            "emitted_at": "t1",
            "page": {
                "workspaces": [{
                    "workspace": {
                        "id": 3,
                        "workspace_key": "ml-prod",
                        "lifecycle_state": "active",
                        "owner_id": 12,
                        "display_name": "ML Prod",
                    },
                    "promotion_runs": [{
                        "id": 91,
                        "status": "running",
                        "playbook": "canary",
                        "promotion_gate_context": {"lane": "fast", "stage": "bake"},
                        "automation_payload": {"step": 2},
                    }],
                    "promotion_postures": [{
                        "promotion_id": 5,
                        "stage": "bake",
                        "track_name": "standard",
                        "track_tier": "gold",
                        "status": "pending",
                        "allowed": true,
                        "updated_at": "t0",
                    }],
                    "recent_runs": [{
                        "run": {"id": 31, "status": "succeeded", "playbook": "reattest"},
                        "retry_attempt": 1,
                        "retry_limit": 3,
                        "duration_seconds": 42.7,
                        "trust": {"attestation_status": "trusted", "lifecycle_state": "active"},
                        "marketplace": {"status": "listed", "last_completed_at": "t0"},
                        "artifacts": [{"manifest_digest": "sha256:ab", "lane": "fast"}],
                    }],
                }],
            },
        }));
        let text = lines.join("\n");
        assert!(lines[0].contains("lifecycle snapshot (cursor=7)"));
        assert!(text.contains("workspace 3 (ml-prod) state=active owner=12 name=ML Prod"));
        assert!(text.contains("Promotion automation runs:"));
        assert!(text.contains("canary"));
        assert!(text.contains("Promotion posture verdicts:"));
        assert!(text.contains("yes"));
        assert!(text.contains("Recent remediation runs:"));
        assert!(text.contains("1/3"));
        assert!(text.contains("42s"));
        assert!(text.contains("trusted/active"));
        assert!(text.contains("listed @ t0"));
        assert!(text.contains("sha256:ab (lane=fast)"));
    }

    #[test]
    fn snapshot_without_workspaces_reports_emptiness() {
        let mut reconciler = LifecycleReconciler::new();
        let lines = reconciler.apply(&json!({"type": "snapshot", "page": {}}));
        assert!(lines.contains(&"No lifecycle workspaces available".to_string()));
    }

    #[test]
    fn delta_renders_run_and_posture_lines() {
        let mut reconciler = LifecycleReconciler::new();
        let lines = reconciler.apply(&json!({
            "type": "delta",
            "delta": {
                "workspaces": [{
                    "workspace_id": 3,
                    "run_deltas": [{
                        "run_id": 31,
                        "status": "failed",
                        "trust_changes": [
                            {"field": "attestation_status", "current": "untrusted",
                             "previous": "trusted"},
                        ],
                    }],
                    "removed_run_ids": [29],
                    "promotion_run_deltas": [{
                        "run_id": 91,
                        "status": "succeeded",
                        "gate_context_changes": [{"field": "stage", "current": "ship"}],
                    }],
                    "promotion_posture_deltas": [{
                        "promotion_id": 5,
                        "status": "blocked",
                        "allowed": false,
                        "stage": "bake",
                        "veto_reasons": ["attestation stale"],
                        "remediation_hooks": ["reattest"],
                    }],
                    "removed_promotion_ids": [4],
                }],
            },
        }));
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "workspace 3 run 31 -> status=failed trust_changes -> \
             attestation_status=\"untrusted\" (was \"trusted\")"
        );
        assert_eq!(lines[1], "workspace 3 run 29 removed");
        assert_eq!(
            lines[2],
            "workspace 3 promotion-run 91 -> status=succeeded gate_context_changes -> stage=\"ship\""
        );
        assert_eq!(
            lines[3],
            "workspace 3 promotion 5 -> status=blocked allowed=no stage=bake \
             veto=[attestation stale] hooks=[reattest]"
        );
        assert_eq!(lines[4], "workspace 3 promotion 4 removed");
    }

    #[test]
    fn non_object_event_is_dropped() {
        let mut reconciler = LifecycleReconciler::new();
        assert!(reconciler.apply(&json!("heartbeat")).is_empty());
        assert!(reconciler.apply(&json!([1, 2])).is_empty());
    }
}
