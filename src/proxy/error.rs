//! Failures the proxy answers locally instead of relaying.
//!
//! Non-2xx upstream responses are not errors here: they are relayed as-is.
//! Everything below is turned into a JSON body `{"error": tag, "cause": text}`.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag used for every network-level upstream failure.
pub const UPSTREAM_UNREACHABLE: &str = "UpstreamUnreachable";
/// Tag used when the upstream answered with a redirect.
pub const NOT_AUTHENTICATED: &str = "NotAuthenticated";

#[derive(Debug, Error)]
pub enum ProxyError {
    /// DNS, connect, reset, or a body that failed mid-read.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] reqwest::Error),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("upstream sent malformed JSON: {0}")]
    MalformedUpstream(#[source] serde_json::Error),

    #[error("upstream URL '{url}' is invalid: {source}")]
    InvalidUpstreamUrl {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream redirected instead of answering, the session is gone.
    #[error("session expired: upstream redirected to {}", .location.as_deref().unwrap_or("<no location>"))]
    NotAuthenticated { location: Option<String> },

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("request body could not be read: {0}")]
    UnreadableBody(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("no proxy route for {0}")]
    NotFound(String),
}

impl ProxyError {
    /// Stable tag exposed in the error body.
    pub fn tag(&self) -> &'static str {
        match self {
            ProxyError::Upstream(_)
            | ProxyError::Timeout(_)
            | ProxyError::MalformedUpstream(_)
            | ProxyError::InvalidUpstreamUrl { .. } => UPSTREAM_UNREACHABLE,
            ProxyError::NotAuthenticated { .. } => NOT_AUTHENTICATED,
            ProxyError::InvalidBody(_) | ProxyError::UnreadableBody(_) => "InvalidRequestBody",
            ProxyError::PayloadTooLarge(_) => "PayloadTooLarge",
            ProxyError::NotFound(_) => "NotFound",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_)
            | ProxyError::Timeout(_)
            | ProxyError::MalformedUpstream(_)
            | ProxyError::InvalidUpstreamUrl { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::NotAuthenticated { .. } => StatusCode::UNAUTHORIZED,
            ProxyError::InvalidBody(_) | ProxyError::UnreadableBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.tag().to_string(),
            cause: self.to_string(),
        }
    }
}

/// Wire shape of a locally produced error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub cause: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_unreachable() {
        let err = ProxyError::Timeout(Duration::from_secs(30));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.tag(), UPSTREAM_UNREACHABLE);
        assert_eq!(err.to_string(), "upstream did not answer within 30s");
    }

    #[test]
    fn test_not_authenticated_is_distinct() {
        let err = ProxyError::NotAuthenticated {
            location: Some("/SignIn?returnUrl=%2F".into()),
        };
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.body().error, NOT_AUTHENTICATED);
        assert!(err.body().cause.contains("/SignIn?returnUrl=%2F"));
    }

    #[test]
    fn test_malformed_upstream_is_bad_gateway() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProxyError::MalformedUpstream(parse_err);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.tag(), UPSTREAM_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ProxyError::PayloadTooLarge(10).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "PayloadTooLarge");
        assert_eq!(body.cause, "request body exceeds 10 bytes");
    }
}
