//! Request forwarding to the upstream data API.
//!
//! # Flow
//! ```text
//! inbound request under prefix
//!     → rewrite.rs (strip prefix, join base URL, attach raw query)
//!     → headers.rs (allow-list table, token rename)
//!     → body for mutating verbs only (payload.rs)
//!     → one upstream call under a deadline, redirects disabled
//!     → status + allow-listed headers + payload back to the caller
//! ```
//!
//! Nothing is retried and nothing is shared between calls except the
//! connection pool inside the upstream client.

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::proxy::error::ProxyError;
use crate::proxy::headers::HeaderPolicy;
use crate::proxy::payload::Payload;
use crate::proxy::rewrite;

/// Failure to assemble a [`Forwarder`] from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid header name '{0}'")]
    HeaderName(String),
}

/// An upstream answer ready to be sent back to the caller.
#[derive(Debug)]
pub struct Relayed {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub payload: Payload,
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.payload.into_bytes()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Forwards requests under the local prefix to the upstream base URL.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    prefix: String,
    base_url: String,
    token_path: String,
    token_url: Option<String>,
    request_headers: HeaderPolicy,
    response_headers: HeaderPolicy,
    deadline: Duration,
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, BuildError> {
        let inbound_token = parse_header(&config.proxy.token_header)?;
        let upstream_token = parse_header(&config.upstream.token_header)?;

        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
        if !config.upstream.system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            prefix: config.proxy.prefix.clone(),
            base_url: config.upstream.base_url.clone(),
            token_path: config.proxy.token_path.clone(),
            token_url: config.upstream.token_url.clone(),
            request_headers: HeaderPolicy::request(inbound_token, upstream_token),
            response_headers: HeaderPolicy::response(),
            deadline: Duration::from_secs(config.timeouts.upstream_secs),
            max_body_bytes: config.proxy.max_body_bytes,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn token_path(&self) -> &str {
        &self.token_path
    }

    /// True when `path` lies under the proxy prefix.
    pub fn matches(&self, path: &str) -> bool {
        rewrite::strip_prefix(path, &self.prefix).is_some()
    }

    /// Forward one inbound request and collect the upstream answer.
    pub async fn forward(&self, request: Request<Body>) -> Result<Relayed, ProxyError> {
        let (parts, body) = request.into_parts();

        let remainder = rewrite::strip_prefix(parts.uri.path(), &self.prefix)
            .ok_or_else(|| ProxyError::NotFound(parts.uri.path().to_string()))?;
        let url = rewrite::upstream_url(&self.base_url, remainder, parts.uri.query());
        let headers = self.request_headers.apply(&parts.headers);

        let body = if carries_body(&parts.method) {
            self.read_body(&parts.headers, body).await?
        } else {
            None
        };

        tracing::debug!(method = %parts.method, upstream = %url, "Forwarding upstream");
        self.relay(parts.method, &url, headers, body).await
    }

    /// Relay the upstream token fragment for the local token path.
    pub async fn relay_token(&self, inbound: &HeaderMap) -> Result<Relayed, ProxyError> {
        let url = self
            .token_url
            .as_deref()
            .ok_or_else(|| ProxyError::NotFound(self.token_path.clone()))?;
        let headers = self.request_headers.apply(inbound);
        self.relay(Method::GET, url, headers, None).await
    }

    async fn read_body(&self, headers: &HeaderMap, body: Body) -> Result<Option<Bytes>, ProxyError> {
        let declared = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_body_bytes) {
            return Err(ProxyError::PayloadTooLarge(self.max_body_bytes));
        }

        // Chunked bodies carry no length up front; the limit is enforced while reading.
        let bytes = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                return Err(ProxyError::PayloadTooLarge(self.max_body_bytes));
            }
            Err(e) => return Err(ProxyError::UnreadableBody(e.to_string())),
        };
        let payload = Payload::classify(headers.get(CONTENT_TYPE), bytes).map_err(ProxyError::InvalidBody)?;

        if payload.is_empty() {
            Ok(None)
        } else {
            Ok(Some(payload.into_bytes()))
        }
    }

    async fn relay(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Relayed, ProxyError> {
        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder.build().map_err(|source| ProxyError::InvalidUpstreamUrl {
            url: url.to_string(),
            source,
        })?;

        let exchange = async {
            let response = self.client.execute(request).await.map_err(ProxyError::Upstream)?;

            let status = response.status();
            if is_auth_redirect(status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                return Err(ProxyError::NotAuthenticated { location });
            }

            let headers = self.response_headers.apply(response.headers());
            let bytes = response.bytes().await.map_err(ProxyError::Upstream)?;
            let payload =
                Payload::classify(headers.get(CONTENT_TYPE), bytes).map_err(ProxyError::MalformedUpstream)?;

            Ok(Relayed {
                status,
                headers,
                payload,
            })
        };

        tokio::time::timeout(self.deadline, exchange)
            .await
            .map_err(|_| ProxyError::Timeout(self.deadline))?
    }
}

/// GET and HEAD never carry a body upstream.
pub fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Any redirect except 304 means the upstream session has lapsed.
pub fn is_auth_redirect(status: StatusCode) -> bool {
    status.is_redirection() && status != StatusCode::NOT_MODIFIED
}

fn parse_header(name: &str) -> Result<HeaderName, BuildError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| BuildError::HeaderName(name.to_string()))
}
