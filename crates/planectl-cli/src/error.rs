//! CLI error type with exit code handling
//!
//! One unified error for command execution. API failures carry the HTTP
//! status so the process can exit with it, matching what scripts driving
//! the CLI key on.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use planectl_api::ApiError;
use planectl_watch::WatchError;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The Host rejected the request
    #[error("API error ({status}): {message}")]
    #[diagnostic(code(planectl::cli::api))]
    Api {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    /// Could not reach the Host or the stream broke mid-flight
    #[error("{message}")]
    #[diagnostic(code(planectl::cli::transport))]
    Transport { message: String },

    /// Invalid user input (bad flag values, malformed JSON payloads)
    #[error("{message}")]
    #[diagnostic(code(planectl::cli::input))]
    Input { message: String },

    /// IO error writing output
    #[error("IO error: {0}")]
    #[diagnostic(code(planectl::cli::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Exit code for this error. API failures exit with the HTTP status.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Api { status, .. } => i32::from(*status),
            CliError::Transport { .. } => exit_codes::ERROR,
            CliError::Input { .. } => exit_codes::ERROR,
            CliError::Io(_) => exit_codes::ERROR,
        }
    }

    /// The raw error body the Host returned, when it parsed as JSON.
    /// Printed alongside the message in JSON mode.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            CliError::Api { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status {
                status,
                message,
                payload,
            } => CliError::Api {
                status,
                message,
                payload,
            },
            other => CliError::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<WatchError> for CliError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::Output(io) => CliError::Io(io),
            other => CliError::Transport {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
