use std::sync::Arc;

use iamsync_core::AppResult;
use iamsync_domain::{AssignmentDefinition, AssignmentScope, BindingChange, Principal};
use tracing::info;

use crate::IdentityProviderClient;

/// Terminal state of an assignment reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// The principal already held the role; nothing was written.
    NoChange,
    /// The policy document was rewritten.
    Assigned {
        /// How the binding was changed.
        change: BindingChange,
    },
}

/// Application service that grants one role to one principal on one resource.
#[derive(Clone)]
pub struct AssignmentReconciler {
    client: Arc<dyn IdentityProviderClient>,
}

impl AssignmentReconciler {
    /// Creates a reconciler from the provider client.
    #[must_use]
    pub fn new(client: Arc<dyn IdentityProviderClient>) -> Self {
        Self { client }
    }

    /// Applies a validated assignment.
    pub async fn reconcile(&self, assignment: &AssignmentDefinition) -> AppResult<AssignmentOutcome> {
        self.apply_binding(assignment.scope(), assignment.role(), assignment.principal())
            .await
    }

    /// Reads the resource policy, grants the role and writes the whole document back.
    pub async fn apply_binding(
        &self,
        scope: &AssignmentScope,
        role: &str,
        principal: &Principal,
    ) -> AppResult<AssignmentOutcome> {
        let resource = scope.resource_path();
        let mut policy = self.client.get_iam_policy(scope).await?;

        let change = policy.grant(role, principal.as_str());
        if !change.is_mutation() {
            info!(
                resource = %resource,
                role,
                principal = %principal,
                "principal already holds role, no action taken"
            );
            return Ok(AssignmentOutcome::NoChange);
        }

        info!(
            resource = %resource,
            role,
            principal = %principal,
            change = ?change,
            "writing updated policy"
        );
        self.client.set_iam_policy(scope, &policy).await?;
        info!(resource = %resource, role, principal = %principal, "role assigned");

        Ok(AssignmentOutcome::Assigned { change })
    }
}
