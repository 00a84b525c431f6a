//! Trust registry stream reconciler
//!
//! Keyed by VM instance id. Attestation, lifecycle, remediation
//! state/attempts and the staleness flag are diffed; freshness deadline,
//! provenance ref, transition reason and server name are context.
//! `version` is monotonic on the server side and is echoed verbatim,
//! never diffed.

use std::collections::HashMap;

use serde_json::Value;

use crate::event::TrustEvent;

use super::Reconciler;

#[derive(Debug, Default)]
struct InstancePosture {
    attestation_status: Option<String>,
    lifecycle_state: Option<String>,
    remediation_state: Option<String>,
    remediation_attempts: Option<i64>,
    stale: Option<bool>,
    freshness_deadline: Option<String>,
    provenance_ref: Option<String>,
    server_name: Option<String>,
}

/// Keyed reconciler for `/api/trust/registry/stream`.
#[derive(Debug, Default)]
pub struct TrustReconciler {
    state: HashMap<i64, InstancePosture>,
}

impl TrustReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&mut self, event: &TrustEvent) -> Option<String> {
        let posture = self.state.entry(event.vm_instance_id).or_default();
        let mut changes: Vec<String> = Vec::new();

        if let Some(status) = &event.attestation_status {
            match posture.attestation_status.replace(status.clone()) {
                None => changes.push(format!("status {status}")),
                Some(previous) if previous != *status => {
                    changes.push(format!("status {previous} -> {status}"));
                }
                Some(_) => {}
            }
        }

        if let Some(lifecycle) = &event.lifecycle_state {
            match posture.lifecycle_state.replace(lifecycle.clone()) {
                None => changes.push(format!("lifecycle {lifecycle}")),
                Some(previous) if previous != *lifecycle => {
                    changes.push(format!("lifecycle {previous} -> {lifecycle}"));
                }
                Some(_) => {}
            }
        }

        if let Some(remediation) = &event.remediation_state {
            match posture.remediation_state.replace(remediation.clone()) {
                None => changes.push(format!("remediation {remediation}")),
                Some(previous) if previous != *remediation => {
                    changes.push(format!("remediation {previous} -> {remediation}"));
                }
                Some(_) => {}
            }
        }

        if let Some(attempts) = event.remediation_attempts {
            if posture.remediation_attempts != Some(attempts) {
                changes.push(format!("attempts {attempts}"));
            }
            posture.remediation_attempts = Some(attempts);
        }

        if let Some(deadline) = &event.freshness_deadline {
            posture.freshness_deadline = Some(deadline.clone());
        }

        if let Some(stale) = event.stale {
            if posture.stale != Some(stale) {
                let mut descriptor =
                    format!("freshness {}", if stale { "stale" } else { "fresh" });
                if let Some(deadline) = &posture.freshness_deadline {
                    descriptor.push_str(&format!(" (deadline {deadline})"));
                }
                changes.push(descriptor);
            }
            posture.stale = Some(stale);
        }

        if let Some(provenance_ref) = &event.provenance_ref {
            posture.provenance_ref = Some(provenance_ref.clone());
        }
        if let Some(server_name) = &event.server_name {
            posture.server_name = Some(server_name.clone());
        }

        if changes.is_empty() {
            return None;
        }

        let triggered = event.triggered_at.as_deref().unwrap_or("unknown");
        let mut header = format!("[{triggered}] server {}", event.server_id);
        if let Some(name) = &posture.server_name {
            header.push_str(&format!(" ({name})"));
        }
        header.push_str(&format!(" vm {}", event.vm_instance_id));

        let mut segments = vec![header, changes.join("; ")];
        if let Some(provenance_ref) = &event.provenance_ref {
            segments.push(format!("provenance {provenance_ref}"));
        }
        if let Some(reason) = &event.transition_reason {
            segments.push(format!("reason {reason}"));
        }
        if let Some(version) = event.version {
            segments.push(format!("v{version}"));
        }

        Some(segments.join(" | "))
    }
}

impl Reconciler for TrustReconciler {
    fn apply(&mut self, event: &Value) -> Vec<String> {
        let Some(event) = TrustEvent::from_value(event) else {
            return Vec::new();
        };
        self.render(&event).into_iter().collect()
    }
}
