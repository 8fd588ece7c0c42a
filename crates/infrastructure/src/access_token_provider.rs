//! Ambient access token sources.

use async_trait::async_trait;
use iamsync_core::{AppError, AppResult};
use reqwest::header;
use serde::Deserialize;

/// Supplies bearer tokens for identity provider calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a currently valid access token.
    async fn access_token(&self) -> AppResult<String>;
}

/// Provider returning a token handed in by the caller, e.g. from CI.
#[derive(Clone)]
pub struct StaticAccessTokenProvider {
    token: String,
}

impl StaticAccessTokenProvider {
    /// Creates a provider for a fixed token.
    pub fn new(token: impl Into<String>) -> AppResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AppError::Validation(
                "static access token must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            token: token.trim().to_owned(),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessTokenProvider {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
}

/// Provider reading the default service account token from the compute metadata server.
#[derive(Clone)]
pub struct MetadataServerTokenProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl MetadataServerTokenProvider {
    /// Creates a provider against the metadata server at `base_url`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataServerTokenProvider {
    async fn access_token(&self) -> AppResult<String> {
        let endpoint = format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.base_url
        );
        let response = self
            .http_client
            .get(endpoint)
            .header("Metadata-Flavor", "Google")
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| {
                AppError::Transport(format!("failed to call metadata token endpoint: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Transport(format!(
                "metadata token endpoint returned status {}: {body}",
                status.as_u16()
            )));
        }

        let token = response
            .json::<MetadataTokenResponse>()
            .await
            .map_err(|error| {
                AppError::Transport(format!(
                    "failed to parse metadata token response body: {error}"
                ))
            })?;

        Ok(token.access_token)
    }
}
