//! Error types for Host API operations

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response from the Host. Carries the raw payload so callers
    /// can forward the server's own wording to the operator.
    #[error("API error ({status}): {message}")]
    Status {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid host URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// HTTP status code, when the failure came from a server response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a `Status` error from a response body.
    ///
    /// The body is parsed as JSON when possible; the message prefers the
    /// server's `error` field, then falls back to the serialized payload.
    pub(crate) fn from_body(status: u16, body: String) -> Self {
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::String(text)) => ApiError::Status {
                status,
                message: text.clone(),
                payload: Some(Value::String(text)),
            },
            Ok(payload) => {
                let message = payload
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string());
                ApiError::Status {
                    status,
                    message,
                    payload: Some(payload),
                }
            }
            Err(_) => ApiError::Status {
                status,
                message: body.clone(),
                payload: if body.is_empty() {
                    None
                } else {
                    Some(Value::String(body))
                },
            },
        }
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
