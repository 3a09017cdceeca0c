//! Request and response bodies as a tagged variant.
//!
//! Content-type is inspected once, when the payload is built. Structured
//! bodies are re-serialized on the way out; raw bodies are never touched.

use axum::body::Bytes;
use axum::http::HeaderValue;
use serde_json::Value;

/// A proxied body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Structured(Value),
    Raw(Bytes),
}

impl Payload {
    /// Classify `bytes` by `content_type`. Fails only when the content type
    /// claims JSON and the bytes do not parse.
    pub fn classify(content_type: Option<&HeaderValue>, bytes: Bytes) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() || !content_type.is_some_and(is_json) {
            return Ok(Payload::Raw(bytes));
        }
        serde_json::from_slice(&bytes).map(Payload::Structured)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Raw(bytes) if bytes.is_empty())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Structured(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            // Serializing a `Value` cannot fail: keys are always strings.
            Payload::Structured(value) => Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
            Payload::Raw(bytes) => bytes,
        }
    }
}

/// `application/json` or any `+json` structured-syntax suffix.
pub fn is_json(content_type: &HeaderValue) -> bool {
    let Ok(value) = content_type.to_str() else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
