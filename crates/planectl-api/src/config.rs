//! Client configuration
//!
//! Resolution order for every knob is flag, then environment, then
//! default; the CLI layer does the flag/env merge via clap and hands the
//! resolved values here.

use std::time::Duration;

/// Environment variable carrying the Host base URL
pub const ENV_HOST: &str = "PLANECTL_HOST";

/// Environment variable carrying the bearer token
pub const ENV_TOKEN: &str = "PLANECTL_TOKEN";

/// Default Host base URL for local development
pub const DEFAULT_HOST: &str = "http://localhost:3000";

/// Default timeout for one-shot requests, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolved connection settings for the Host API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
    /// Timeout applied to one-shot requests (subscriptions are unbounded)
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}
