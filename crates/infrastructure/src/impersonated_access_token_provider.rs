//! Short-lived impersonated credentials via the IAM Credentials API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use iamsync_core::{AppError, AppResult};
use reqwest::header;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::AccessTokenProvider;

/// OAuth scope requested for impersonated tokens.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const REFRESH_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Serialize)]
struct GenerateAccessTokenRequest<'a> {
    scope: &'a [String],
    lifetime: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenResponse {
    access_token: String,
    expire_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges an ambient token for a token of a fixed target service account.
pub struct ImpersonatedAccessTokenProvider {
    http_client: reqwest::Client,
    source: Arc<dyn AccessTokenProvider>,
    credentials_base_url: String,
    target_service_account: String,
    scopes: Vec<String>,
    lifetime_seconds: u32,
    cached: Mutex<Option<CachedToken>>,
}

impl ImpersonatedAccessTokenProvider {
    /// Creates an impersonating provider with the cloud-platform scope.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        source: Arc<dyn AccessTokenProvider>,
        credentials_base_url: impl Into<String>,
        target_service_account: impl Into<String>,
        lifetime_seconds: u32,
    ) -> Self {
        Self {
            http_client,
            source,
            credentials_base_url: credentials_base_url.into().trim_end_matches('/').to_owned(),
            target_service_account: target_service_account.into(),
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_owned()],
            lifetime_seconds: lifetime_seconds.max(1),
            cached: Mutex::new(None),
        }
    }

    async fn generate_access_token(&self) -> AppResult<CachedToken> {
        let source_token = self.source.access_token().await?;
        let endpoint = format!(
            "{}/v1/projects/-/serviceAccounts/{}:generateAccessToken",
            self.credentials_base_url, self.target_service_account
        );
        let response = self
            .http_client
            .post(endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {source_token}"))
            .json(&GenerateAccessTokenRequest {
                scope: &self.scopes,
                lifetime: format!("{}s", self.lifetime_seconds),
            })
            .send()
            .await
            .map_err(|error| {
                AppError::Transport(format!(
                    "failed to call generateAccessToken for '{}': {error}",
                    self.target_service_account
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Transport(format!(
                "generateAccessToken for '{}' returned status {}: {body}",
                self.target_service_account,
                status.as_u16()
            )));
        }

        let body = response
            .json::<GenerateAccessTokenResponse>()
            .await
            .map_err(|error| {
                AppError::Transport(format!(
                    "failed to parse generateAccessToken response body: {error}"
                ))
            })?;

        info!(
            target_service_account = %self.target_service_account,
            expires_at = %body.expire_time,
            "obtained impersonated access token"
        );
        Ok(CachedToken {
            token: body.access_token,
            expires_at: body.expire_time,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ImpersonatedAccessTokenProvider {
    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at - Duration::seconds(REFRESH_MARGIN_SECONDS) > Utc::now()
        {
            debug!("reusing cached impersonated access token");
            return Ok(token.token.clone());
        }

        let token = self.generate_access_token().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}
