use std::collections::BTreeSet;

use async_trait::async_trait;
use iamsync_core::{AppResult, OrganizationId};
use iamsync_domain::{AssignmentScope, CustomRolePayload, PolicyDocument, RemoteRole};

/// Port for the identity provider that stores roles and resource policies.
///
/// Lookups return `Ok(None)` when the remote resource does not exist; `Err` is
/// reserved for failures.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Returns the permissions of a predefined role, `roles/{name}`.
    async fn get_predefined_role(&self, name: &str) -> AppResult<Option<BTreeSet<String>>>;

    /// Returns the permissions of any organization custom role.
    async fn get_custom_role(
        &self,
        organization_id: &str,
        role_id: &str,
    ) -> AppResult<Option<BTreeSet<String>>>;

    /// Returns the deployed custom role managed by this tool.
    async fn get_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
    ) -> AppResult<Option<RemoteRole>>;

    /// Creates an organization custom role.
    async fn create_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
        payload: &CustomRolePayload,
    ) -> AppResult<RemoteRole>;

    /// Patches the fields named in `update_mask` on an organization custom role.
    async fn patch_org_custom_role(
        &self,
        organization_id: &OrganizationId,
        role_id: &str,
        payload: &CustomRolePayload,
        update_mask: &[&str],
    ) -> AppResult<RemoteRole>;

    /// Reads the policy document attached to a resource.
    async fn get_iam_policy(&self, scope: &AssignmentScope) -> AppResult<PolicyDocument>;

    /// Replaces the policy document attached to a resource.
    async fn set_iam_policy(
        &self,
        scope: &AssignmentScope,
        policy: &PolicyDocument,
    ) -> AppResult<PolicyDocument>;
}
