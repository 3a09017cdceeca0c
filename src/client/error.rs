use axum::http::StatusCode;
use thiserror::Error;

use crate::proxy::Payload;
use crate::token::TokenError;

/// Outcome of a failed API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token could be obtained; the call was not attempted.
    #[error("anti-forgery token unavailable: {0}")]
    TokenUnavailable(#[from] TokenError),

    /// The session has expired. Re-authenticate instead of retrying.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("upstream unreachable: {cause}")]
    UpstreamUnreachable { cause: String },

    /// The upstream answered with a non-2xx status, relayed verbatim.
    #[error("upstream returned {status}")]
    UpstreamError { status: StatusCode, payload: Payload },

    /// The local proxy itself could not be reached.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// True when the caller should send the user through sign-in.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, ApiError::NotAuthenticated)
    }
}
