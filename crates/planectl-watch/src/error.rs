//! Watch-loop error types

use thiserror::Error;

/// Fatal failures of a watch invocation.
///
/// Per-event anomalies (unparseable payloads, missing identity fields)
/// are absorbed by the pipeline and never show up here; only stream-level
/// problems terminate the loop.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("stream transport failed: {message}")]
    Transport { message: String },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl WatchError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
