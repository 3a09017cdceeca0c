//! Client side of the proxy: what the portal front-end does per call.
//!
//! # Data Flow
//! ```text
//! ApiClient::send
//!     → TokenProvider::acquire_token (fresh token, no cache)
//!     → {site}{proxy_root}/{path} with the token header attached
//!     → response.rs (ApiResponse | ApiError)
//! ```

pub mod api;
pub mod error;
pub mod response;

pub use api::ApiClient;
pub use error::ApiError;
pub use response::ApiResponse;

/// Where the local site and its proxy live.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the local site, e.g. `http://localhost:8080`.
    pub site_url: String,
    pub proxy_root: String,
    pub token_path: String,
    pub token_header: String,
    pub timeout_secs: u64,
    /// Honor HTTP_PROXY/HTTPS_PROXY. Off by default since the site is local.
    pub system_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site_url: "http://127.0.0.1:8080".to_string(),
            proxy_root: "/_api".to_string(),
            token_path: "/_layouts/tokenhtml".to_string(),
            token_header: "__RequestVerificationToken".to_string(),
            timeout_secs: 60,
            system_proxy: false,
        }
    }
}
