//! Runtime policy stream reconciler
//!
//! Tracks per-server posture across decision/attestation events and
//! reports field-level transitions. Fields fall into three buckets:
//! diffed (first observation and changes are reported), context-only
//! (stored for the snapshot tail, never reported on their own), and the
//! free-text notes filtered by the notable-note predicate.

use std::collections::HashMap;

use serde_json::Value;

use crate::event::PolicyEvent;
use crate::render::colorize_status;

use super::Reconciler;

/// Last-observed posture for one server.
#[derive(Debug, Default)]
struct ServerPosture {
    backend: Option<String>,
    candidate_backend: Option<String>,
    fallback_backend: Option<String>,
    active_instance: Option<String>,
    attestation_status: Option<String>,
    trust_event_id: Option<Value>,
    trust_lifecycle_state: Option<String>,
    trust_previous_lifecycle_state: Option<String>,
    trust_remediation_attempts: Option<i64>,
    trust_freshness_deadline: Option<String>,
    trust_provenance_ref: Option<String>,
    trust_provenance: Option<Value>,
    stale: Option<bool>,
    evaluation_required: Option<bool>,
    governance_required: Option<bool>,
    provider_key_state: Option<String>,
    provider_key_vetoed: Option<bool>,
    provider_key_rotation_due_at: Option<String>,
    provider_key_notes: Vec<String>,
    provider_key_provider_id: Option<String>,
    instance_id: Option<String>,
}

/// Keyed reconciler for `/api/policy/stream`.
#[derive(Debug, Default)]
pub struct PolicyReconciler {
    use_color: bool,
    state: HashMap<i64, ServerPosture>,
}

impl PolicyReconciler {
    pub fn new(use_color: bool) -> Self {
        Self {
            use_color,
            state: HashMap::new(),
        }
    }

    fn render(&mut self, event: &PolicyEvent) -> Option<String> {
        let use_color = self.use_color;
        let posture = self.state.entry(event.server_id).or_default();
        let mut changes: Vec<String> = Vec::new();

        if let Some(backend) = &event.backend {
            match posture.backend.replace(backend.clone()) {
                None => changes.push(format!("backend {backend}")),
                Some(previous) if previous != *backend => {
                    changes.push(format!("backend {previous} -> {backend}"));
                }
                Some(_) => {}
            }
        }

        if let Some(candidate) = &event.candidate_backend {
            posture.candidate_backend = Some(candidate.clone());
        }

        // Fallback activation is always worth a line, even when repeated.
        if let Some(fallback) = &event.fallback_backend {
            posture.fallback_backend = Some(fallback.clone());
            changes.push(format!("fallback -> {fallback}"));
        }

        if let Some(instance) = &event.instance_id {
            posture.active_instance = Some(instance.clone());
        }

        if let Some(status) = &event.attestation_status {
            let current = colorize_status(status, use_color);
            match posture.attestation_status.replace(status.clone()) {
                None => changes.push(format!("attestation {current}")),
                Some(previous) if previous != *status => {
                    changes.push(format!(
                        "attestation {} -> {}",
                        colorize_status(&previous, use_color),
                        current
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(trust_event) = &event.trust_event {
            posture.trust_event_id = trust_event.id.clone();
            let reason = trust_event
                .transition_reason
                .clone()
                .unwrap_or_else(|| "posture".to_string());
            let mut descriptor = format!("trust {reason}");
            if let Some(triggered) = &trust_event.triggered_at {
                descriptor.push_str(&format!(" @ {triggered}"));
            }
            changes.push(descriptor);
        }

        if let Some(trust_event_id) = &event.trust_event_id {
            posture.trust_event_id = Some(trust_event_id.clone());
        }

        if let Some(lifecycle) = &event.trust_lifecycle_state {
            match posture.trust_lifecycle_state.replace(lifecycle.clone()) {
                None => changes.push(format!("trust lifecycle {lifecycle}")),
                Some(previous) if previous != *lifecycle => {
                    changes.push(format!("trust lifecycle {previous} -> {lifecycle}"));
                }
                Some(_) => {}
            }
        }

        if let Some(previous_lifecycle) = &event.trust_previous_lifecycle_state {
            posture.trust_previous_lifecycle_state = Some(previous_lifecycle.clone());
        }

        if let Some(attempts) = event.trust_remediation_attempts {
            if posture.trust_remediation_attempts != Some(attempts) {
                changes.push(format!("trust remediation {attempts}"));
            }
            posture.trust_remediation_attempts = Some(attempts);
        }

        if let Some(deadline) = &event.freshness_deadline {
            posture.trust_freshness_deadline = Some(deadline.clone());
        }
        if let Some(provenance_ref) = &event.trust_provenance_ref {
            posture.trust_provenance_ref = Some(provenance_ref.clone());
        }
        if let Some(provenance) = &event.trust_provenance {
            posture.trust_provenance = Some(provenance.clone());
        }

        if let Some(stale) = event.stale {
            if posture.stale != Some(stale) {
                changes.push(format!(
                    "evidence {}",
                    if stale { "stale" } else { "fresh" }
                ));
            }
            posture.stale = Some(stale);
        }

        for (value, previous, label) in [
            (
                event.evaluation_required,
                &mut posture.evaluation_required,
                "evaluation",
            ),
            (
                event.governance_required,
                &mut posture.governance_required,
                "governance",
            ),
        ] {
            if let Some(required) = value {
                let current = if required { "required" } else { "clear" };
                match previous.replace(required) {
                    None => changes.push(format!("{label} {current}")),
                    Some(was) if was != required => {
                        let prev_label = if was { "required" } else { "clear" };
                        changes.push(format!("{label} {prev_label} -> {current}"));
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(provider_key) = &event.provider_key {
            if let Some(state) = &provider_key.state {
                match posture.provider_key_state.replace(state.clone()) {
                    None => changes.push(format!("provider key {state}")),
                    Some(previous) if previous != *state => {
                        changes.push(format!("provider key {previous} -> {state}"));
                    }
                    Some(_) => {}
                }
            }
            if let Some(vetoed) = provider_key.vetoed {
                if posture.provider_key_vetoed != Some(vetoed) {
                    changes.push(format!(
                        "provider key {}",
                        if vetoed { "vetoed" } else { "cleared" }
                    ));
                }
                posture.provider_key_vetoed = Some(vetoed);
            }
            if let Some(rotation_due) = &provider_key.rotation_due_at {
                posture.provider_key_rotation_due_at = Some(rotation_due.clone());
            }
            if !provider_key.notes.is_empty() {
                posture.provider_key_notes = provider_key.notes.clone();
            }
            if let Some(provider_id) = &provider_key.provider_id {
                posture.provider_key_provider_id = Some(provider_id.clone());
            }
        }

        if let Some(instance) = &event.instance_id {
            match posture.instance_id.replace(instance.clone()) {
                None => changes.push(format!("instance {instance}")),
                Some(previous) if previous != *instance => {
                    changes.push(format!("instance {previous} -> {instance}"));
                }
                Some(_) => {}
            }
        }

        let signal_notes = notable_notes(&event.notes);
        if changes.is_empty() && signal_notes.is_empty() {
            return None;
        }

        let header = format!(
            "[{}] server {} {}",
            event.timestamp,
            event.server_id,
            event.kind.to_uppercase()
        );

        let mut parts: Vec<String> = Vec::new();
        if !changes.is_empty() {
            parts.push(changes.join("; "));
        }
        if let Some(active) = &posture.active_instance {
            parts.push(format!("Active instance: {active}"));
        }
        if let Some(latest) = &posture.attestation_status {
            parts.push(format!("Latest posture: {latest}"));
        }
        if let Some(key_state) = &posture.provider_key_state {
            let mut descriptor = format!("Provider key: {key_state}");
            if posture.provider_key_vetoed == Some(true) {
                descriptor.push_str(" (vetoed)");
            }
            parts.push(descriptor);
            if let Some(rotation_due) = &posture.provider_key_rotation_due_at {
                parts.push(format!("BYOK rotation due @ {rotation_due}"));
            }
        }
        if !signal_notes.is_empty() {
            parts.push(signal_notes.join(", "));
        }

        Some(format!("{header} {}", parts.join(" | ")))
    }
}

impl Reconciler for PolicyReconciler {
    fn apply(&mut self, event: &Value) -> Vec<String> {
        let Some(event) = PolicyEvent::from_value(event) else {
            return Vec::new();
        };
        self.render(&event).into_iter().collect()
    }
}

/// The server-side note vocabulary this predicate matches is external and
/// enumerated on purpose; keep entries in sync with the Host.
fn notable_notes(notes: &[String]) -> Vec<String> {
    notes
        .iter()
        .filter(|note| {
            note.starts_with("vm:attestation")
                || note.starts_with("attestation:")
                || note.contains("fallback")
                || note.starts_with("provider-key:")
        })
        .cloned()
        .collect()
}
