//! Per-stream reconcilers
//!
//! One reconciler per watched domain. Each owns its keyed posture state
//! for the lifetime of a watch invocation, decodes its own event shape,
//! and turns an incoming event into zero or more rendered lines. An empty
//! result means the event carried nothing the operator needs to see
//! (heartbeat, duplicate snapshot, or malformed identity fields).

pub mod lifecycle;
pub mod marketplace;
pub mod policy;
pub mod remediation;
pub mod trust;

use serde_json::Value;

pub use lifecycle::LifecycleReconciler;
pub use marketplace::MarketplaceReconciler;
pub use policy::PolicyReconciler;
pub use remediation::RemediationReconciler;
pub use trust::TrustReconciler;

/// A watched domain's event handler.
pub trait Reconciler {
    /// Fold one decoded event into state and render its observable changes.
    ///
    /// Must never fail: malformed events are dropped (empty result) and
    /// must not corrupt state for any other entity.
    fn apply(&mut self, event: &Value) -> Vec<String>;
}
