//! Marketplace provider stream reconciler
//!
//! Marketplace events are an audit feed, not a posture: every decodable
//! event becomes exactly one summary line with whatever identifiers the
//! payload carried.

use serde_json::Value;

use crate::event::MarketplaceEvent;
use crate::render::colorize_status;

use super::Reconciler;

/// Stateless summarizer for `/api/marketplace/providers/{id}/events/stream`.
#[derive(Debug)]
pub struct MarketplaceReconciler {
    use_color: bool,
}

impl MarketplaceReconciler {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// One-line summary, shared with the one-shot event listing.
    pub fn summarize(&self, event: &MarketplaceEvent) -> String {
        let mut parts = vec![format!("[{}] {}", event.occurred_at, event.event_type)];
        if let Some(submission_id) = &event.submission_id {
            parts.push(format!("submission={submission_id}"));
        }
        if let Some(evaluation_id) = &event.evaluation_id {
            parts.push(format!("evaluation={evaluation_id}"));
        }
        if let Some(promotion_id) = &event.promotion_id {
            parts.push(format!("promotion={promotion_id}"));
        }
        if let Some(status) = &event.status {
            parts.push(format!("status={}", colorize_status(status, self.use_color)));
        }
        if let Some(actor_ref) = &event.actor_ref {
            parts.push(format!("actor={actor_ref}"));
        }
        if event.note_count > 0 {
            parts.push(format!("notes={}", event.note_count));
        }
        parts.join(" ")
    }
}

impl Reconciler for MarketplaceReconciler {
    fn apply(&mut self, event: &Value) -> Vec<String> {
        let Some(event) = MarketplaceEvent::from_value(event) else {
            return Vec::new();
        };
        vec![self.summarize(&event)]
    }
}
