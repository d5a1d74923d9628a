//! Token endpoint grants: silent refresh and authorization-code exchange.

use std::time::Duration;

use async_trait::async_trait;

use crate::credential::{Credential, TokenPair};
use crate::error::{AuthError, Result};

/// Default timeout for token endpoint requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Performs the refresh-token grant.
///
/// Implementations never retry; the caller decides what a failure means.
#[async_trait]
pub trait RefreshClient: Send + Sync + std::fmt::Debug {
    async fn refresh(
        &self,
        endpoint: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenPair>;
}

/// Performs the authorization-code grant.
#[async_trait]
pub trait CodeExchange: Send + Sync + std::fmt::Debug {
    async fn exchange_code(&self, credential: &Credential, code: &str) -> Result<TokenPair>;
}

/// reqwest-backed client for the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    http: reqwest::Client,
}

impl Default for HttpTokenEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTokenEndpoint {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<(u16, String)> {
        let response = self
            .http
            .post(endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("token request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[async_trait]
impl RefreshClient for HttpTokenEndpoint {
    async fn refresh(
        &self,
        endpoint: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenPair> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let (status, body) = self.post_form(endpoint, &form).await?;
        if status != 200 {
            tracing::warn!(status, "Token refresh rejected");
            return Err(AuthError::RefreshFailed { status });
        }
        parse_token_pair(&body)
    }
}

#[async_trait]
impl CodeExchange for HttpTokenEndpoint {
    async fn exchange_code(&self, credential: &Credential, code: &str) -> Result<TokenPair> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("redirect_uri", credential.callback.as_str()),
        ];

        let (status, body) = self.post_form(&credential.endpoint, &form).await?;
        if status != 200 {
            tracing::warn!(status, "Authorization code exchange rejected");
            return Err(AuthError::ProviderDenied {
                code: format!("http_{status}"),
                description: (!body.is_empty()).then_some(body),
            });
        }
        parse_token_pair(&body)
    }
}

/// Parse a 200 token response; both token fields are required and non-empty.
pub fn parse_token_pair(body: &str) -> Result<TokenPair> {
    let pair: TokenPair = serde_json::from_str(body)
        .map_err(|e| AuthError::MalformedProviderResponse(e.to_string()))?;
    if pair.access_token.is_empty() {
        return Err(AuthError::MalformedProviderResponse(
            "empty access_token".to_string(),
        ));
    }
    if pair.refresh_token.is_empty() {
        return Err(AuthError::MalformedProviderResponse(
            "empty refresh_token".to_string(),
        ));
    }
    Ok(pair)
}
