//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the portal
//! proxy. All types derive Serde traits for deserialization from TOML files,
//! and every section has defaults so a minimal file only names the upstream.

use serde::{Deserialize, Serialize};

/// Root configuration for the portal proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Local surface of the proxy (path prefix, token path, body limits).
    pub proxy: LocalConfig,

    /// Upstream data API settings.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Local path layout served by the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Fixed path prefix that is rewritten onto the upstream base URL.
    pub prefix: String,

    /// Local path that relays the anti-forgery token fragment.
    pub token_path: String,

    /// Name under which callers send the anti-forgery token.
    pub token_header: String,

    /// Largest inbound body accepted for mutating requests.
    pub max_body_bytes: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            prefix: "/_api".to_string(),
            token_path: "/_layouts/tokenhtml".to_string(),
            token_header: "__RequestVerificationToken".to_string(),
            max_body_bytes: 4 * 1024 * 1024, // 4MB
        }
    }
}

/// Upstream data API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL every rewritten path is appended to.
    pub base_url: String,

    /// Upstream URL of the token fragment. Token relay is off when unset.
    pub token_url: Option<String>,

    /// Header name the upstream expects the anti-forgery token under.
    pub token_header: String,

    /// Honor HTTP_PROXY/HTTPS_PROXY when calling the upstream.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/_api".to_string(),
            token_url: None,
            token_header: "__RequestVerificationToken".to_string(),
            system_proxy: true,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout towards the upstream in seconds.
    pub connect_secs: u64,

    /// Deadline for one upstream round-trip (headers and body) in seconds.
    pub upstream_secs: u64,

    /// Total time an inbound request may take in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Single-line compact log output instead of the full format.
    pub compact_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            compact_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
