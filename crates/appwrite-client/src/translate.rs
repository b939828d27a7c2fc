//! Error translation for responses with status >= 400

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

/// Error payload the backend sends with `application/json` failures
#[derive(Debug, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl ErrorPayload {
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

/// Translate a failed response into an [`ApiError`].
///
/// JSON bodies are read as an [`ErrorPayload`]; any other body (or JSON that
/// does not parse) becomes the message as-is. The raw body is always kept.
pub fn translate_error(status: u16, headers: &HeaderMap, body: &[u8]) -> ApiError {
    let raw = String::from_utf8_lossy(body).into_owned();

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

    let payload = if is_json { ErrorPayload::parse(body) } else { None };
    debug!("Translating HTTP {} error (structured: {})", status, payload.is_some());

    match payload {
        Some(payload) => ApiError {
            message: payload.message.unwrap_or_default(),
            code: payload
                .code
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(status),
            kind: payload.kind,
            response: Some(raw),
        },
        None => ApiError {
            message: raw.clone(),
            code: status,
            kind: None,
            response: Some(raw),
        },
    }
}
