//! HTTP and event-stream client for the Host control plane.
//!
//! Exposes a thin request/response wrapper (`ApiClient`) plus the
//! subscription entry point used by the watch engine. Responses are kept
//! loosely typed (`serde_json::Value`) because the Host API surface is
//! wide and the CLI renders most payloads generically.

pub mod client;
pub mod config;
pub mod error;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
