//! Configuration validation.
//!
//! Serde handles syntax; this module checks the values make sense together:
//! prefix shape, upstream URL scheme, header names and timeouts. The
//! request timeout must outlast the upstream deadline so a slow upstream
//! still gets a 502 body rather than a bare 408.
//! All problems are reported, not just the first.

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("proxy.prefix '{0}' must start with '/' and must not end with '/'")]
    Prefix(String),

    #[error("proxy.token_path '{0}' must start with '/'")]
    TokenPath(String),

    #[error("proxy.token_path '{0}' must not fall under proxy.prefix")]
    TokenPathShadowed(String),

    #[error("{field} '{value}' is not an http(s) URL")]
    Url { field: &'static str, value: String },

    #[error("{field} '{value}' is not a valid header name")]
    HeaderName { field: &'static str, value: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.request_secs ({request}) must exceed timeouts.upstream_secs ({upstream})")]
    RequestTimeoutTooShort { request: u64, upstream: u64 },

    #[error("proxy.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let prefix = &config.proxy.prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::Prefix(prefix.clone()));
    }

    let token_path = &config.proxy.token_path;
    if !token_path.starts_with('/') {
        errors.push(ValidationError::TokenPath(token_path.clone()));
    } else if crate::proxy::rewrite::strip_prefix(token_path, prefix).is_some() {
        errors.push(ValidationError::TokenPathShadowed(token_path.clone()));
    }

    check_url(&mut errors, "upstream.base_url", &config.upstream.base_url);
    if let Some(token_url) = &config.upstream.token_url {
        check_url(&mut errors, "upstream.token_url", token_url);
    }

    check_header(&mut errors, "proxy.token_header", &config.proxy.token_header);
    check_header(&mut errors, "upstream.token_header", &config.upstream.token_header);

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    let timeouts = &config.timeouts;
    if timeouts.upstream_secs > 0 && timeouts.request_secs > 0 && timeouts.request_secs <= timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: timeouts.request_secs,
            upstream: timeouts.upstream_secs,
        });
    }
    if config.proxy.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let ok = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::Url {
            field,
            value: value.to_string(),
        });
    }
}

fn check_header(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderName {
            field,
            value: value.to_string(),
        });
    }
}
