//! Typed partial event records
//!
//! Stream payloads are loosely shaped and vary per domain, so each record
//! is a partial view: identity fields are mandatory and type-checked once
//! here, everything else is optional. A constructor returning `None`
//! means the event is malformed or irrelevant for that domain and must be
//! dropped without touching any posture state.

use serde_json::Value;

fn get_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn get_i64(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn get_bool(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

/// Collect the string entries of an array field, dropping everything else.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Runtime policy stream event, keyed by server id.
#[derive(Debug, Clone)]
pub struct PolicyEvent {
    pub server_id: i64,
    pub timestamp: String,
    pub kind: String,
    pub backend: Option<String>,
    pub candidate_backend: Option<String>,
    pub fallback_backend: Option<String>,
    pub instance_id: Option<String>,
    pub attestation_status: Option<String>,
    pub trust_event: Option<TrustEventRef>,
    pub trust_event_id: Option<Value>,
    pub trust_lifecycle_state: Option<String>,
    pub trust_previous_lifecycle_state: Option<String>,
    pub trust_remediation_attempts: Option<i64>,
    pub freshness_deadline: Option<String>,
    pub trust_provenance_ref: Option<String>,
    pub trust_provenance: Option<Value>,
    pub stale: Option<bool>,
    pub evaluation_required: Option<bool>,
    pub governance_required: Option<bool>,
    pub provider_key: Option<ProviderKeyPosture>,
    pub notes: Vec<String>,
}

/// Embedded trust transition reference on a policy event.
#[derive(Debug, Clone)]
pub struct TrustEventRef {
    pub id: Option<Value>,
    pub transition_reason: Option<String>,
    pub triggered_at: Option<String>,
}

/// Provider key posture block on a policy event.
#[derive(Debug, Clone)]
pub struct ProviderKeyPosture {
    pub state: Option<String>,
    pub vetoed: Option<bool>,
    pub rotation_due_at: Option<String>,
    pub notes: Vec<String>,
    pub provider_id: Option<String>,
}

impl PolicyEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        let server_id = get_i64(value, "server_id")?;
        let trust_event = value.get("trust_event").and_then(|v| {
            v.is_object().then(|| TrustEventRef {
                id: v.get("id").cloned(),
                transition_reason: get_str(v, "transition_reason"),
                triggered_at: get_str(v, "triggered_at"),
            })
        });
        let provider_key = value.get("provider_key_posture").and_then(|v| {
            v.is_object().then(|| ProviderKeyPosture {
                state: get_str(v, "state"),
                vetoed: get_bool(v, "vetoed"),
                rotation_due_at: get_str(v, "rotation_due_at"),
                notes: string_list(v.get("notes")),
                provider_id: get_str(v, "provider_id"),
            })
        });
        Some(Self {
            server_id,
            timestamp: get_str(value, "timestamp").unwrap_or_default(),
            kind: get_str(value, "type").unwrap_or_else(|| "unknown".to_string()),
            backend: get_str(value, "backend"),
            candidate_backend: get_str(value, "candidate_backend"),
            fallback_backend: get_str(value, "fallback_backend"),
            instance_id: get_str(value, "instance_id"),
            attestation_status: get_str(value, "attestation_status"),
            trust_event,
            trust_event_id: value
                .get("trust_event_id")
                .filter(|v| !v.is_null())
                .cloned(),
            trust_lifecycle_state: get_str(value, "trust_lifecycle_state"),
            trust_previous_lifecycle_state: get_str(value, "trust_previous_lifecycle_state"),
            trust_remediation_attempts: get_i64(value, "trust_remediation_attempts"),
            freshness_deadline: get_str(value, "freshness_expires_at")
                .or_else(|| get_str(value, "trust_freshness_deadline")),
            trust_provenance_ref: get_str(value, "trust_provenance_ref"),
            trust_provenance: value
                .get("trust_provenance")
                .filter(|v| !v.is_null())
                .cloned(),
            stale: get_bool(value, "stale"),
            evaluation_required: get_bool(value, "evaluation_required"),
            governance_required: get_bool(value, "governance_required"),
            provider_key,
            notes: string_list(value.get("notes")),
        })
    }
}

/// Trust registry stream event, keyed by VM instance id.
#[derive(Debug, Clone)]
pub struct TrustEvent {
    pub server_id: i64,
    pub vm_instance_id: i64,
    pub triggered_at: Option<String>,
    pub server_name: Option<String>,
    pub attestation_status: Option<String>,
    pub lifecycle_state: Option<String>,
    pub remediation_state: Option<String>,
    pub remediation_attempts: Option<i64>,
    pub freshness_deadline: Option<String>,
    pub stale: Option<bool>,
    pub transition_reason: Option<String>,
    pub provenance_ref: Option<String>,
    pub version: Option<i64>,
}

impl TrustEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            server_id: get_i64(value, "server_id")?,
            vm_instance_id: get_i64(value, "vm_instance_id")?,
            triggered_at: get_str(value, "triggered_at"),
            server_name: get_str(value, "server_name").filter(|s| !s.trim().is_empty()),
            attestation_status: get_str(value, "attestation_status"),
            lifecycle_state: get_str(value, "lifecycle_state"),
            remediation_state: get_str(value, "remediation_state"),
            remediation_attempts: get_i64(value, "remediation_attempts"),
            freshness_deadline: get_str(value, "freshness_deadline"),
            stale: get_bool(value, "stale"),
            transition_reason: get_str(value, "transition_reason"),
            provenance_ref: get_str(value, "provenance_ref"),
            version: get_i64(value, "version"),
        })
    }
}

/// Remediation stream event, keyed by run id.
#[derive(Debug, Clone)]
pub struct RemediationEvent {
    pub run_id: i64,
    pub instance_id: i64,
    pub body: Option<Value>,
    pub policy_feedback: Vec<String>,
    pub remediation_hooks: Vec<String>,
    pub accelerator_gates: Vec<AcceleratorGate>,
    pub accelerators: Vec<AcceleratorPosture>,
}

/// Per-accelerator gate verdict attached to a remediation status event.
#[derive(Debug, Clone)]
pub struct AcceleratorGate {
    pub accelerator_id: String,
    pub hooks: Vec<String>,
    pub reasons: Vec<String>,
}

/// Per-accelerator posture attached to a remediation status event.
#[derive(Debug, Clone)]
pub struct AcceleratorPosture {
    pub accelerator_id: String,
    pub accelerator_type: String,
    pub posture: String,
    pub policy_feedback: Vec<String>,
}

impl RemediationEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        let run_id = get_i64(value, "run_id")?;
        let instance_id = get_i64(value, "instance_id")?;

        let (remediation_hooks, accelerator_gates) = match value.get("policy_gate") {
            Some(gate) if gate.is_object() => (
                string_list(gate.get("remediation_hooks")),
                accelerator_gates(gate.get("accelerator_gates")),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        Some(Self {
            run_id,
            instance_id,
            body: value.get("event").filter(|v| !v.is_null()).cloned(),
            policy_feedback: string_list(value.get("policy_feedback")),
            remediation_hooks,
            accelerator_gates,
            accelerators: accelerator_postures(value.get("accelerators")),
        })
    }
}

fn accelerator_gates(value: Option<&Value>) -> Vec<AcceleratorGate> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let accelerator_id = get_str(entry, "accelerator_id")?;
            let hooks = string_list(entry.get("hooks"));
            let reasons = string_list(entry.get("reasons"));
            if hooks.is_empty() && reasons.is_empty() {
                return None;
            }
            Some(AcceleratorGate {
                accelerator_id,
                hooks,
                reasons,
            })
        })
        .collect()
}

fn accelerator_postures(value: Option<&Value>) -> Vec<AcceleratorPosture> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| AcceleratorPosture {
            accelerator_id: get_str(entry, "accelerator_id")
                .or_else(|| get_str(entry, "id"))
                .unwrap_or_else(|| "unknown".to_string()),
            accelerator_type: get_str(entry, "accelerator_type")
                .or_else(|| get_str(entry, "kind"))
                .unwrap_or_else(|| "unknown".to_string()),
            posture: get_str(entry, "posture").unwrap_or_else(|| "unknown".to_string()),
            policy_feedback: string_list(entry.get("policy_feedback")),
        })
        .collect()
}

/// Lifecycle console stream event.
///
/// Page and delta subtrees stay as raw JSON: their rendering is deeply
/// structural and walked field by field by the lifecycle reconciler.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: Option<String>,
    pub cursor: Option<Value>,
    pub emitted_at: Option<String>,
    pub error: Option<String>,
    pub page: Option<Value>,
    pub delta: Option<Value>,
}

impl LifecycleEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Self {
            kind: get_str(value, "type"),
            cursor: value.get("cursor").filter(|v| !v.is_null()).cloned(),
            emitted_at: get_str(value, "emitted_at"),
            error: get_str(value, "error"),
            page: value.get("page").filter(|v| v.is_object()).cloned(),
            delta: value.get("delta").filter(|v| v.is_object()).cloned(),
        })
    }
}

/// Marketplace provider stream event.
#[derive(Debug, Clone)]
pub struct MarketplaceEvent {
    pub event_type: String,
    pub occurred_at: String,
    pub submission_id: Option<String>,
    pub evaluation_id: Option<String>,
    pub promotion_id: Option<String>,
    pub status: Option<String>,
    pub actor_ref: Option<String>,
    pub note_count: usize,
}

impl MarketplaceEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let payload = value.get("payload").filter(|v| v.is_object());
        let status = payload
            .and_then(|p| get_str(p, "status").or_else(|| get_str(p, "state")));
        let note_count = payload
            .and_then(|p| p.get("notes"))
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        Some(Self {
            event_type: get_str(value, "event_type").unwrap_or_else(|| "event".to_string()),
            occurred_at: get_str(value, "occurred_at").unwrap_or_else(|| "?".to_string()),
            submission_id: get_str(value, "submission_id"),
            evaluation_id: get_str(value, "evaluation_id"),
            promotion_id: get_str(value, "promotion_id"),
            status,
            actor_ref: get_str(value, "actor_ref"),
            note_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn policy_event_requires_integer_server_id() {
        assert!(PolicyEvent::from_value(&json!({"type": "decision"})).is_none());
        assert!(PolicyEvent::from_value(&json!({"server_id": "nine"})).is_none());
        assert!(PolicyEvent::from_value(&json!({"server_id": 9})).is_some());
    }

    #[test]
    fn policy_event_defaults_and_optionals() {
        let event = PolicyEvent::from_value(&json!({
            "server_id": 4,
            "backend": "vllm",
            "provider_key_posture": {"state": "active", "vetoed": false},
            "notes": ["attestation: ok", 7, "  "],
        }))
        .unwrap();
        assert_eq!(event.kind, "unknown");
        assert_eq!(event.timestamp, "");
        assert_eq!(event.backend.as_deref(), Some("vllm"));
        let key = event.provider_key.unwrap();
        assert_eq!(key.state.as_deref(), Some("active"));
        assert_eq!(key.vetoed, Some(false));
        assert_eq!(event.notes, vec!["attestation: ok".to_string()]);
    }

    #[test]
    fn policy_event_freshness_field_fallback() {
        let event = PolicyEvent::from_value(&json!({
            "server_id": 1,
            "trust_freshness_deadline": "2026-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(
            event.freshness_deadline.as_deref(),
            Some("2026-01-01T00:00:00Z")
        );
    }

    #[test]
    fn trust_event_requires_both_identity_fields() {
        assert!(TrustEvent::from_value(&json!({"server_id": 2})).is_none());
        assert!(TrustEvent::from_value(&json!({"vm_instance_id": 3})).is_none());
        assert!(
            TrustEvent::from_value(&json!({"server_id": 2, "vm_instance_id": 3})).is_some()
        );
    }

    #[test]
    fn trust_event_blank_server_name_is_dropped() {
        let event =
            TrustEvent::from_value(&json!({"server_id": 2, "vm_instance_id": 3, "server_name": " "}))
                .unwrap();
        assert!(event.server_name.is_none());
    }

    #[test]
    fn remediation_event_parses_gates_and_accelerators() {
        let event = RemediationEvent::from_value(&json!({
            "run_id": 11,
            "instance_id": 4,
            "policy_gate": {
                "remediation_hooks": ["reattest"],
                "accelerator_gates": [
                    {"accelerator_id": "gpu-0", "hooks": ["drain"], "reasons": []},
                    {"accelerator_id": "gpu-1", "hooks": [], "reasons": []},
                    {"hooks": ["ignored"]},
                ],
            },
            "accelerators": [{"id": "gpu-0", "kind": "h100", "posture": "degraded"}],
        }))
        .unwrap();
        assert_eq!(event.remediation_hooks, vec!["reattest".to_string()]);
        assert_eq!(event.accelerator_gates.len(), 1);
        assert_eq!(event.accelerator_gates[0].accelerator_id, "gpu-0");
        assert_eq!(event.accelerators.len(), 1);
        assert_eq!(event.accelerators[0].accelerator_type, "h100");
        assert_eq!(event.accelerators[0].posture, "degraded");
    }

    #[test]
    fn remediation_event_requires_run_and_instance() {
        assert!(RemediationEvent::from_value(&json!({"run_id": 11})).is_none());
        assert!(RemediationEvent::from_value(&json!({"run_id": "11", "instance_id": 4})).is_none());
    }

    #[test]
    fn marketplace_event_pulls_status_from_payload() {
        let event = MarketplaceEvent::from_value(&json!({
            "event_type": "evaluation.updated",
            "payload": {"state": "running", "notes": ["a", "b"]},
        }))
        .unwrap();
        assert_eq!(event.status.as_deref(), Some("running"));
        assert_eq!(event.note_count, 2);
        assert_eq!(event.occurred_at, "?");
    }
}
