//! API client that calls the upstream through the local proxy.

use std::time::Duration;

use axum::http::{HeaderName, Method, StatusCode};
use serde_json::Value;

use crate::client::error::ApiError;
use crate::client::response::{classify_response, ApiResponse};
use crate::client::ClientConfig;
use crate::proxy::forward::is_auth_redirect;
use crate::token::{TokenError, TokenProvider};

/// Attaches a fresh anti-forgery token to every call and sends it to the
/// local proxy root.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    token_header: HeaderName,
    tokens: TokenProvider,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let token_header = HeaderName::from_bytes(config.token_header.as_bytes())
            .map_err(|_| ApiError::Config(format!("invalid token header '{}'", config.token_header)))?;

        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs));
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        let site = config.site_url.trim_end_matches('/');
        let tokens = TokenProvider::new(http.clone(), format!("{}{}", site, config.token_path));

        Ok(Self {
            http,
            api_base: format!("{}{}", site, config.proxy_root),
            token_header,
            tokens,
        })
    }

    /// Local URL for an upstream-relative path (which may carry a query).
    pub fn url_for(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.api_base.clone()
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }

    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse, ApiError> {
        let token = match self.tokens.acquire_token().await {
            Ok(token) => token,
            Err(TokenError::Status(status)) if signals_sign_in(status) => {
                return Err(ApiError::NotAuthenticated);
            }
            Err(e) => return Err(ApiError::TokenUnavailable(e)),
        };

        let url = self.url_for(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(self.token_header.clone(), token.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        tracing::debug!(method = %method, url = %url, status = status.as_u16(), "API call finished");
        classify_response(status, &headers, bytes)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn create(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn update(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn replace(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(Method::DELETE, path, None).await
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }
}

fn signals_sign_in(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || is_auth_redirect(status)
}
