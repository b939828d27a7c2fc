//! Client error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error reported by the backend for a response with status >= 400.
///
/// Serializes to the shape surfaced to SDK callers:
/// `{ "message", "code", "type", "response" }`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct ApiError {
    /// Human readable message, either from the JSON payload or the raw body
    pub message: String,
    /// Error code; the HTTP status unless the payload carries its own
    pub code: u16,
    /// Machine readable error type, when the backend supplies one
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Raw response body, kept for diagnostics
    pub response: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
            kind: None,
            response: None,
        }
    }
}

/// Errors surfaced by the request engine
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, DNS or timeout failure. Never retried by the client.
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with status >= 400
    #[error("HTTP error: {0}")]
    Http(#[from] ApiError),

    /// Endpoint and path do not combine into a valid URL
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    /// The TLS backend rejected the requested trust configuration
    #[error("TLS configuration failed: {0}")]
    TlsConfiguration(String),

    /// A header name or value cannot be sent over HTTP
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Parameters or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Reading a local upload source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller cancelled the call before it resolved
    #[error("Call cancelled")]
    Cancelled,

    /// The background dispatch task failed before producing an outcome
    #[error("Dispatch task failed: {0}")]
    Dispatch(String),
}

impl ClientError {
    /// Error code as surfaced to callers; 0 for failures that never reached the backend.
    pub fn code(&self) -> u16 {
        match self {
            ClientError::Http(api) => api.code,
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
            _ => 0,
        }
    }

    /// Message as surfaced to callers
    pub fn message(&self) -> String {
        match self {
            ClientError::Http(api) => api.message.clone(),
            other => other.to_string(),
        }
    }

    /// Structured backend error, if this is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Http(api) => Some(api),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}
