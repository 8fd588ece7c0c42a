use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use iamsync_core::{AppError, AppResult, OrganizationId};
use iamsync_domain::{AssignmentScope, CustomRolePayload, PolicyDocument, RemoteRole};

use crate::IdentityProviderClient;

/// Recorded provider call, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    GetPredefinedRole(String),
    GetCustomRole(String),
    GetOrgCustomRole(String),
    CreateOrgCustomRole(String),
    PatchOrgCustomRole(String, Vec<String>),
    GetIamPolicy(String),
    SetIamPolicy(String),
}

impl ProviderCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreateOrgCustomRole(_) | Self::PatchOrgCustomRole(..) | Self::SetIamPolicy(_)
        )
    }
}

/// In-memory provider keyed by full resource names.
#[derive(Default)]
pub struct FakeIdentityProvider {
    pub base_roles: Mutex<HashMap<String, BTreeSet<String>>>,
    pub failing_base_roles: Mutex<BTreeSet<String>>,
    pub custom_roles: Mutex<HashMap<String, RemoteRole>>,
    pub fail_role_lookup: Mutex<bool>,
    pub policies: Mutex<HashMap<String, PolicyDocument>>,
    pub calls: Mutex<Vec<ProviderCall>>,
}

impl FakeIdentityProvider {
    pub async fn with_base_role(self, name: &str, permissions: &[&str]) -> Self {
        self.base_roles.lock().await.insert(
            name.to_owned(),
            permissions.iter().map(|value| (*value).to_owned()).collect(),
        );
        self
    }

    pub async fn with_custom_role(self, name: &str, role: RemoteRole) -> Self {
        self.custom_roles.lock().await.insert(name.to_owned(), role);
        self
    }

    pub async fn with_policy(self, resource: &str, policy: PolicyDocument) -> Self {
        self.policies.lock().await.insert(resource.to_owned(), policy);
        self
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn write_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.is_write())
            .count()
    }

    async fn lookup_base_role(&self, name: String) -> AppResult<Option<BTreeSet<String>>> {
        if self.failing_base_roles.lock().await.contains(&name) {
            return Err(AppError::Transport(format!("lookup of '{name}' failed")));
        }
        Ok(self.base_roles.lock().await.get(&name).cloned())
    }
}

#[async_trait]
impl IdentityProviderClient for FakeIdentityProvider {
    async fn get_predefined_role(&self, name: &str) -> AppResult<Option<BTreeSet<String>>> {
        let resource = format!("roles/{name}");
        self.calls
            .lock()
            .await
            .push(ProviderCall::GetPredefinedRole(resource.clone()));
        self.lookup_base_role(resource).await
    }

    async fn get_custom_role(
        &self,
        organization_id: &str,
        role_id: &str,
    ) -> AppResult<Option<BTreeSet<String>>> {
        let resource = format!("organizations/{organization_id}/roles/{role_id}");
        self.calls
            .lock()
            .await
            .push(ProviderCall::GetCustomRole(resource.clone()));
        self.lookup_base_role(resource).await
    }

    async fn get_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
    ) -> AppResult<Option<RemoteRole>> {
        let resource = format!("{}/roles/{role_id}", organization_id.resource_name());
        self.calls
            .lock()
            .await
            .push(ProviderCall::GetOrgCustomRole(resource.clone()));
        if *self.fail_role_lookup.lock().await {
            return Err(AppError::Transport("permission denied".to_owned()));
        }
        Ok(self.custom_roles.lock().await.get(&resource).cloned())
    }

    async fn create_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
        payload: &CustomRolePayload,
    ) -> AppResult<RemoteRole> {
        let resource = format!("{}/roles/{role_id}", organization_id.resource_name());
        self.calls
            .lock()
            .await
            .push(ProviderCall::CreateOrgCustomRole(resource.clone()));
        let role = remote_role_from_payload(resource.as_str(), payload);
        self.custom_roles
            .lock()
            .await
            .insert(resource, role.clone());
        Ok(role)
    }

    async fn patch_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
        payload: &CustomRolePayload,
        update_mask: &[&str],
    ) -> AppResult<RemoteRole> {
        let resource = format!("{}/roles/{role_id}", organization_id.resource_name());
        self.calls.lock().await.push(ProviderCall::PatchOrgCustomRole(
            resource.clone(),
            update_mask.iter().map(|field| (*field).to_owned()).collect(),
        ));
        let role = remote_role_from_payload(resource.as_str(), payload);
        self.custom_roles
            .lock()
            .await
            .insert(resource, role.clone());
        Ok(role)
    }

    async fn get_iam_policy(&self, scope: &AssignmentScope) -> AppResult<PolicyDocument> {
        let resource = scope.resource_path();
        self.calls
            .lock()
            .await
            .push(ProviderCall::GetIamPolicy(resource.clone()));
        Ok(self
            .policies
            .lock()
            .await
            .get(&resource)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_iam_policy(
        &self,
        scope: &AssignmentScope,
        policy: &PolicyDocument,
    ) -> AppResult<PolicyDocument> {
        let resource = scope.resource_path();
        self.calls
            .lock()
            .await
            .push(ProviderCall::SetIamPolicy(resource.clone()));
        self.policies
            .lock()
            .await
            .insert(resource, policy.clone());
        Ok(policy.clone())
    }
}

pub fn remote_role_from_payload(name: &str, payload: &CustomRolePayload) -> RemoteRole {
    RemoteRole {
        name: name.to_owned(),
        title: payload.title.clone(),
        description: payload.description.clone(),
        stage: Some(payload.stage),
        included_permissions: payload.included_permissions.iter().cloned().collect(),
        etag: Some("BwX1".to_owned()),
    }
}
