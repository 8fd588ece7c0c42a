//! REST adapter for the IAM and Cloud Resource Manager APIs.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use iamsync_application::IdentityProviderClient;
use iamsync_core::{AppError, AppResult, OrganizationId};
use iamsync_domain::{AssignmentScope, CustomRolePayload, PolicyDocument, RemoteRole};
use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::AccessTokenProvider;

const REQUESTED_POLICY_VERSION: i32 = 3;

/// Base URLs of the remote APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProviderEndpoints {
    /// IAM API, e.g. `https://iam.googleapis.com`.
    pub iam_base_url: String,
    /// Resource Manager API, e.g. `https://cloudresourcemanager.googleapis.com`.
    pub resource_manager_base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoleRequest<'a> {
    role_id: &'a str,
    role: &'a CustomRolePayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetPolicyOptions {
    requested_policy_version: i32,
}

#[derive(Serialize)]
struct GetIamPolicyRequest {
    options: GetPolicyOptions,
}

#[derive(Serialize)]
struct SetIamPolicyRequest<'a> {
    policy: &'a PolicyDocument,
}

/// HTTP implementation of the identity provider port.
pub struct HttpIdentityProviderClient {
    http_client: reqwest::Client,
    token_provider: Arc<dyn AccessTokenProvider>,
    iam_base_url: String,
    resource_manager_base_url: String,
}

impl HttpIdentityProviderClient {
    /// Creates a client sharing one HTTP connection pool and token source.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        token_provider: Arc<dyn AccessTokenProvider>,
        endpoints: IdentityProviderEndpoints,
    ) -> Self {
        Self {
            http_client,
            token_provider,
            iam_base_url: endpoints.iam_base_url.trim_end_matches('/').to_owned(),
            resource_manager_base_url: endpoints
                .resource_manager_base_url
                .trim_end_matches('/')
                .to_owned(),
        }
    }

    fn role_url(&self, resource_name: &str) -> String {
        format!("{}/v1/{resource_name}", self.iam_base_url)
    }

    fn policy_url(&self, scope: &AssignmentScope, verb: &str) -> String {
        format!(
            "{}/v3/{}:{verb}",
            self.resource_manager_base_url,
            scope.resource_path()
        )
    }

    /// Sends one authorized request; 404 maps to `None`.
    async fn send<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        operation: &str,
    ) -> AppResult<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = self.token_provider.access_token().await?;
        debug!(%method, url = %url, operation, "calling identity provider");

        let mut request = self
            .http_client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|error| {
            AppError::Transport(format!("failed to call {operation}: {error}"))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Transport(format!(
                "{operation} returned status {}: {body}",
                status.as_u16()
            )));
        }

        response.json::<T>().await.map(Some).map_err(|error| {
            AppError::Transport(format!(
                "failed to parse {operation} response body: {error}"
            ))
        })
    }

    async fn send_required<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        operation: &str,
    ) -> AppResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(method, url, body, operation)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{operation} returned 404")))
    }

    async fn get_role(&self, resource_name: &str) -> AppResult<Option<RemoteRole>> {
        let url = parse_url(self.role_url(resource_name).as_str())?;
        self.send::<(), RemoteRole>(
            Method::GET,
            url,
            None,
            format!("get role '{resource_name}'").as_str(),
        )
        .await
    }
}

fn parse_url(value: &str) -> AppResult<Url> {
    Url::parse(value).map_err(|error| AppError::Internal(format!("invalid URL '{value}': {error}")))
}

#[async_trait]
impl IdentityProviderClient for HttpIdentityProviderClient {
    async fn get_predefined_role(&self, name: &str) -> AppResult<Option<BTreeSet<String>>> {
        Ok(self
            .get_role(format!("roles/{name}").as_str())
            .await?
            .map(|role| role.included_permissions))
    }

    async fn get_custom_role(
        &self,
        organization_id: &str,
        role_id: &str,
    ) -> AppResult<Option<BTreeSet<String>>> {
        Ok(self
            .get_role(format!("organizations/{organization_id}/roles/{role_id}").as_str())
            .await?
            .map(|role| role.included_permissions))
    }

    async fn get_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
    ) -> AppResult<Option<RemoteRole>> {
        self.get_role(format!("{}/roles/{role_id}", organization_id.resource_name()).as_str())
            .await
    }

    async fn create_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
        payload: &CustomRolePayload,
    ) -> AppResult<RemoteRole> {
        let parent = organization_id.resource_name();
        let url = parse_url(format!("{}/roles", self.role_url(parent.as_str())).as_str())?;
        self.send_required(
            Method::POST,
            url,
            Some(&CreateRoleRequest {
                role_id,
                role: payload,
            }),
            format!("create role '{role_id}' in {parent}").as_str(),
        )
        .await
    }

    async fn patch_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
        payload: &CustomRolePayload,
        update_mask: &[&str],
    ) -> AppResult<RemoteRole> {
        let resource_name = format!("{}/roles/{role_id}", organization_id.resource_name());
        let endpoint = self.role_url(resource_name.as_str());
        let url = Url::parse_with_params(
            endpoint.as_str(),
            &[("updateMask", update_mask.join(","))],
        )
        .map_err(|error| AppError::Internal(format!("invalid URL '{endpoint}': {error}")))?;

        self.send_required(
            Method::PATCH,
            url,
            Some(payload),
            format!("patch role '{resource_name}'").as_str(),
        )
        .await
    }

    async fn get_iam_policy(&self, scope: &AssignmentScope) -> AppResult<PolicyDocument> {
        let url = parse_url(self.policy_url(scope, "getIamPolicy").as_str())?;
        self.send_required(
            Method::POST,
            url,
            Some(&GetIamPolicyRequest {
                options: GetPolicyOptions {
                    requested_policy_version: REQUESTED_POLICY_VERSION,
                },
            }),
            format!("get IAM policy of '{scope}'").as_str(),
        )
        .await
    }

    async fn set_iam_policy(
        &self,
        scope: &AssignmentScope,
        policy: &PolicyDocument,
    ) -> AppResult<PolicyDocument> {
        let url = parse_url(self.policy_url(scope, "setIamPolicy").as_str())?;
        self.send_required(
            Method::POST,
            url,
            Some(&SetIamPolicyRequest { policy }),
            format!("set IAM policy of '{scope}'").as_str(),
        )
        .await
    }
}
