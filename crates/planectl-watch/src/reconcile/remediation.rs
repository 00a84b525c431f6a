//! Remediation run stream reconciler
//!
//! Keyed by run id. Log events are operator output and are always
//! rendered. Status events render the policy gate summaries and
//! per-accelerator postures, then the run status; a status event that
//! repeats the known status with nothing else to say is suppressed.

use std::collections::HashMap;

use serde_json::Value;

use crate::event::RemediationEvent;

use super::Reconciler;

#[derive(Debug, Default)]
struct RunPosture {
    status: Option<String>,
}

/// Keyed reconciler for `/api/trust/remediation/stream`.
#[derive(Debug, Default)]
pub struct RemediationReconciler {
    state: HashMap<i64, RunPosture>,
}

impl RemediationReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&mut self, event: &RemediationEvent) -> Vec<String> {
        let prefix = format!("run {} (instance {})", event.run_id, event.instance_id);
        let Some(body) = &event.body else {
            return Vec::new();
        };
        let kind = body
            .get("event")
            .or_else(|| body.get("type"))
            .and_then(Value::as_str);

        match kind {
            Some("log") => {
                let timestamp = body.get("timestamp").and_then(Value::as_str).unwrap_or("?");
                let stream = body.get("stream").and_then(Value::as_str).unwrap_or("-");
                let message = body.get("message").and_then(Value::as_str).unwrap_or("");
                vec![format!("[{timestamp}] {prefix} [{stream}] {message}")]
            }
            Some("status") => self.render_status(event, body, &prefix),
            _ => vec![format!(
                "{prefix} event {}: {body}",
                kind.unwrap_or("unknown")
            )],
        }
    }

    fn render_status(
        &mut self,
        event: &RemediationEvent,
        body: &Value,
        prefix: &str,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        if !event.remediation_hooks.is_empty() {
            lines.push(format!(
                "{prefix} remediation gate -> {}",
                event.remediation_hooks.join(", ")
            ));
        }
        for gate in &event.accelerator_gates {
            let hooks = if gate.hooks.is_empty() {
                String::new()
            } else {
                format!(" hooks={}", gate.hooks.join(", "))
            };
            let reasons = if gate.reasons.is_empty() {
                String::new()
            } else {
                format!(" reasons={}", gate.reasons.join("; "))
            };
            lines.push(format!(
                "{prefix} accelerator gate {}{hooks}{reasons}",
                gate.accelerator_id
            ));
        }
        if !event.policy_feedback.is_empty() {
            lines.push(format!(
                "{prefix} policy feedback -> {}",
                event.policy_feedback.join(", ")
            ));
        }
        for accelerator in &event.accelerators {
            let notes = if accelerator.policy_feedback.is_empty() {
                String::new()
            } else {
                format!(" notes={}", accelerator.policy_feedback.join(", "))
            };
            lines.push(format!(
                "{prefix} accelerator {} ({}) posture {}{notes}",
                accelerator.accelerator_id, accelerator.accelerator_type, accelerator.posture
            ));
        }

        let status = body.get("status").and_then(Value::as_str);
        let posture = self.state.entry(event.run_id).or_default();
        if let Some(status) = status {
            let failure = body
                .get("failure_reason")
                .and_then(Value::as_str)
                .unwrap_or("-");
            let message = body.get("message").and_then(Value::as_str).unwrap_or("");
            match posture.status.replace(status.to_string()) {
                None => lines.push(format!(
                    "{prefix} status -> {status} (failure {failure}) {message}"
                )),
                Some(previous) if previous != status => lines.push(format!(
                    "{prefix} status {previous} -> {status} (failure {failure}) {message}"
                )),
                Some(_) => {}
            }
        }

        lines
    }
}

impl Reconciler for RemediationReconciler {
    fn apply(&mut self, event: &Value) -> Vec<String> {
        let Some(event) = RemediationEvent::from_value(event) else {
            return Vec::new();
        };
        self.render(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_events_are_always_rendered() {
        let mut reconciler = RemediationReconciler::new();
        let event = json!({
            "run_id": 11,
            "instance_id": 4,
            "event": {
                "event": "log",
                "stream": "stdout",
                "message": "re-attesting enclave",
                "timestamp": "2026-08-25T10:00:00Z",
            },
        });
        let first = reconciler.apply(&event);
        assert_eq!(
            first,
            vec![
                "[2026-08-25T10:00:00Z] run 11 (instance 4) [stdout] re-attesting enclave"
                    .to_string()
            ]
        );
        // Logs are never deduplicated.
        assert_eq!(reconciler.apply(&event).len(), 1);
    }

    #[test]
    fn status_event_renders_gates_feedback_and_status() {
        let mut reconciler = RemediationReconciler::new();
        let lines = reconciler.apply(&json!({
            "run_id": 11,
            "instance_id": 4,
            "policy_feedback": ["quarantine recommended"],
            "policy_gate": {
                "remediation_hooks": ["reattest", "rotate-keys"],
                "accelerator_gates": [
                    {"accelerator_id": "gpu-0", "hooks": ["drain"], "reasons": ["ecc errors"]},
                ],
            },
            "accelerators": [
                {"accelerator_id": "gpu-0", "accelerator_type": "h100", "posture": "degraded",
                 "policy_feedback": ["replace"]},
            ],
            "event": {"event": "status", "status": "running", "message": "step 2/5"},
        }));
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("remediation gate -> reattest, rotate-keys"));
        assert!(lines[1].contains("accelerator gate gpu-0 hooks=drain reasons=ecc errors"));
        assert!(lines[2].contains("policy feedback -> quarantine recommended"));
        assert!(lines[3].contains("accelerator gpu-0 (h100) posture degraded notes=replace"));
        assert!(lines[4].contains("status -> running (failure -) step 2/5"));
    }

    #[test]
    fn repeated_status_without_context_is_suppressed() {
        let mut reconciler = RemediationReconciler::new();
        let event = json!({
            "run_id": 11,
            "instance_id": 4,
            "event": {"event": "status", "status": "running"},
        });
        assert_eq!(reconciler.apply(&event).len(), 1);
        assert!(reconciler.apply(&event).is_empty());
    }

    #[test]
    fn status_transition_shows_previous_value() {
        let mut reconciler = RemediationReconciler::new();
        reconciler.apply(&json!({
            "run_id": 11, "instance_id": 4,
            "event": {"event": "status", "status": "running"},
        }));
        let lines = reconciler.apply(&json!({
            "run_id": 11, "instance_id": 4,
            "event": {"event": "status", "status": "failed", "failure_reason": "sla-expired"},
        }));
        assert!(lines[0].contains("status running -> failed (failure sla-expired)"));
    }

    #[test]
    fn runs_are_tracked_independently() {
        let mut reconciler = RemediationReconciler::new();
        reconciler.apply(&json!({
            "run_id": 11, "instance_id": 4,
            "event": {"event": "status", "status": "running"},
        }));
        let other = reconciler.apply(&json!({
            "run_id": 12, "instance_id": 4,
            "event": {"event": "status", "status": "running"},
        }));
        assert!(other[0].contains("run 12"));
        assert!(other[0].contains("status -> running"));
    }

    #[test]
    fn unknown_event_kind_gets_a_fallback_line() {
        let mut reconciler = RemediationReconciler::new();
        let lines = reconciler.apply(&json!({
            "run_id": 11,
            "instance_id": 4,
            "event": {"type": "checkpoint", "detail": "x"},
        }));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("event checkpoint"));
    }

    #[test]
    fn missing_identity_drops_the_event() {
        let mut reconciler = RemediationReconciler::new();
        assert!(reconciler
            .apply(&json!({"instance_id": 4, "event": {"event": "log"}}))
            .is_empty());
    }
}
