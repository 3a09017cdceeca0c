//! Anti-forgery token acquisition.
//!
//! # Data Flow
//! ```text
//! TokenProvider::acquire_token
//!     → GET token endpoint (markup fragment with a hidden input)
//!     → extract.rs (first <input>, its value attribute)
//!     → AntiForgeryToken
//! ```
//!
//! A failure here aborts the outbound call. There is no fallback to an
//! unauthenticated request.

pub mod extract;
pub mod provider;

use axum::http::StatusCode;
use thiserror::Error;

pub use extract::{extract_token, AntiForgeryToken};
pub use provider::TokenProvider;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("token endpoint returned status {0}")]
    Status(StatusCode),

    #[error("no token value found in the token fragment")]
    Missing,
}
