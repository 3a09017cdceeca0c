//! Token acquisition over HTTP.

use crate::token::extract::{extract_token, AntiForgeryToken};
use crate::token::TokenError;

/// Fetches a fresh anti-forgery token from a fixed endpoint.
///
/// Each call performs exactly one GET. Tokens are not cached and failures
/// are not retried; that is left to the caller.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl TokenProvider {
    /// `client` should be the caller's session-bearing client so the
    /// endpoint sees the same cookies as the calls the token is used for.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn acquire_token(&self) -> Result<AntiForgeryToken, TokenError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(TokenError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Status(status));
        }

        let markup = response.text().await.map_err(TokenError::Unreachable)?;
        let token = extract_token(&markup)?;
        tracing::debug!(endpoint = %self.endpoint, "Anti-forgery token acquired");
        Ok(token)
    }
}
