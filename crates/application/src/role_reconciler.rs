use std::collections::BTreeSet;
use std::sync::Arc;

use iamsync_core::{AppResult, OrganizationId};
use iamsync_domain::{
    CUSTOM_ROLE_UPDATE_MASK, CustomRoleDefinition, RemoteRole, RoleDelta, RoleReference,
};
use tracing::{info, warn};

use crate::IdentityProviderClient;

#[cfg(test)]
mod tests;

/// Terminal state of a custom role reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleReconcileOutcome {
    /// The role did not exist and was created.
    Created {
        /// Role returned by the provider.
        role: RemoteRole,
    },
    /// The role existed and was patched.
    Updated {
        /// Role returned by the provider.
        role: RemoteRole,
        /// Difference that triggered the patch.
        delta: RoleDelta,
    },
    /// The deployed role already matched; nothing was written.
    Unchanged {
        /// Full provider resource name.
        role_name: String,
    },
}

/// Application service that converges one custom role onto its definition.
#[derive(Clone)]
pub struct RoleReconciler {
    client: Arc<dyn IdentityProviderClient>,
}

impl RoleReconciler {
    /// Creates a reconciler from the provider client.
    #[must_use]
    pub fn new(client: Arc<dyn IdentityProviderClient>) -> Self {
        Self { client }
    }

    /// Resolves explicit plus inherited permissions minus exclusions.
    ///
    /// Base roles that cannot be looked up contribute nothing and are logged.
    pub async fn resolve_permissions(
        &self,
        definition: &CustomRoleDefinition,
    ) -> AppResult<BTreeSet<String>> {
        let mut inherited = Vec::with_capacity(definition.base_roles().len());
        if !definition.base_roles().is_empty() {
            info!(
                role_id = definition.id(),
                base_role_count = definition.base_roles().len(),
                "expanding permissions from base roles"
            );
        }

        for reference in definition.base_roles() {
            if let Some(permissions) = self.expand_base_role(reference).await {
                inherited.push(permissions);
            }
        }

        definition.resolve_permissions(inherited)
    }

    async fn expand_base_role(&self, reference: &RoleReference) -> Option<BTreeSet<String>> {
        let lookup = match reference {
            RoleReference::Predefined { name } => self.client.get_predefined_role(name).await,
            RoleReference::OrganizationCustom {
                organization_id,
                role_id,
            } => self.client.get_custom_role(organization_id, role_id).await,
        };

        match lookup {
            Ok(Some(permissions)) => Some(permissions),
            Ok(None) => {
                warn!(base_role = %reference, "base role not found, skipping");
                None
            }
            Err(error) => {
                warn!(
                    base_role = %reference,
                    error = %error,
                    "could not fetch base role, skipping"
                );
                None
            }
        }
    }

    /// Creates, patches or leaves untouched the role `organizations/{org}/roles/{id}`.
    pub async fn reconcile(
        &self,
        definition: &CustomRoleDefinition,
        organization_id: &OrganizationId,
    ) -> AppResult<RoleReconcileOutcome> {
        let permissions = self.resolve_permissions(definition).await?;
        let payload = definition.payload(&permissions);
        let role_name = format!(
            "{}/roles/{}",
            organization_id.resource_name(),
            definition.id()
        );

        let Some(existing) = self
            .client
            .get_org_custom_role(organization_id, definition.id())
            .await?
        else {
            info!(role = %role_name, "creating custom role");
            let role = self
                .client
                .create_org_custom_role(organization_id, definition.id(), &payload)
                .await?;
            info!(role = %role_name, response = %render_role(&role), "custom role created");
            return Ok(RoleReconcileOutcome::Created { role });
        };

        let delta = RoleDelta::between(&existing, &payload);
        if !delta.has_changes() {
            info!(role = %role_name, "custom role is already up to date, no action taken");
            return Ok(RoleReconcileOutcome::Unchanged { role_name });
        }

        info!(
            role = %role_name,
            added = ?delta.added_permissions,
            removed = ?delta.removed_permissions,
            title_changed = delta.title_changed,
            description_changed = delta.description_changed,
            "updating custom role"
        );
        let role = self
            .client
            .patch_org_custom_role(
                organization_id,
                definition.id(),
                &payload,
                CUSTOM_ROLE_UPDATE_MASK,
            )
            .await?;
        info!(role = %role_name, response = %render_role(&role), "custom role updated");

        Ok(RoleReconcileOutcome::Updated { role, delta })
    }
}

fn render_role(role: &RemoteRole) -> String {
    serde_json::to_string_pretty(role).unwrap_or_else(|_| format!("{role:?}"))
}
