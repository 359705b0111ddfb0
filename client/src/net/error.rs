//! Error taxonomy for backend calls.

use serde_json::Value;

/// Shown when neither the backend nor the transport gave a usable message.
pub const DEFAULT_ERROR_MESSAGE: &str = "request failed, please try again later";

/// Failure captured inside an `Envelope`. Cloneable so envelopes stay plain data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No response arrived (connection refused, DNS, TLS, reset).
    #[error("{0}")]
    Network(String),

    /// The per-call timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request body could not be built.
    #[error("request encode failed: {0}")]
    Encode(String),
}

impl RequestError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
}

/// Errors surfaced to typed callers that need more than the raw envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    #[error("{0}")]
    Unexpected(String),
}

/// Pick the message to show for a failed response: the backend's `message`
/// field, else the raw body, else the generic fallback.
#[must_use]
pub fn error_message(data: &Value) -> String {
    match data {
        Value::Object(map) => match map.get("message") {
            Some(Value::String(m)) if !m.is_empty() => m.clone(),
            _ => data.to_string(),
        },
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Null | Value::String(_) => DEFAULT_ERROR_MESSAGE.to_owned(),
        other => other.to_string(),
    }
}
