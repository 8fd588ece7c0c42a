use iamsync_core::{AppResult, OrganizationId};
use iamsync_domain::DefinitionDocument;
use tracing::info;

use crate::{
    AssignmentOutcome, AssignmentReconciler, DefinitionLoader, RoleReconcileOutcome,
    RoleReconciler,
};

/// Outcome of reconciling one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The file declared a custom role.
    Role(RoleReconcileOutcome),
    /// The file declared an assignment.
    Assignment(AssignmentOutcome),
}

impl ReconciliationOutcome {
    /// Returns a stable label for the terminal state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Role(RoleReconcileOutcome::Created { .. }) => "created",
            Self::Role(RoleReconcileOutcome::Updated { .. }) => "updated",
            Self::Role(RoleReconcileOutcome::Unchanged { .. }) => "unchanged",
            Self::Assignment(AssignmentOutcome::Assigned { .. }) => "assigned",
            Self::Assignment(AssignmentOutcome::NoChange) => "no_change",
        }
    }

    /// Returns true when the provider state was written.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Role(RoleReconcileOutcome::Unchanged { .. })
                | Self::Assignment(AssignmentOutcome::NoChange)
        )
    }
}

/// Loads one definition file and routes it to the matching reconciler.
#[derive(Clone)]
pub struct ReconciliationDispatcher {
    loader: DefinitionLoader,
    role_reconciler: RoleReconciler,
    assignment_reconciler: AssignmentReconciler,
}

impl ReconciliationDispatcher {
    /// Creates a dispatcher from its collaborators.
    #[must_use]
    pub fn new(
        loader: DefinitionLoader,
        role_reconciler: RoleReconciler,
        assignment_reconciler: AssignmentReconciler,
    ) -> Self {
        Self {
            loader,
            role_reconciler,
            assignment_reconciler,
        }
    }

    /// Reconciles the definition stored under `file_name`.
    pub async fn reconcile_file(
        &self,
        file_name: &str,
        organization_id: &OrganizationId,
    ) -> AppResult<ReconciliationOutcome> {
        let document = self.loader.load(file_name).await?;

        let outcome = match document {
            DefinitionDocument::Role(definition) => {
                info!(
                    role_id = definition.id(),
                    organization_id = %organization_id,
                    "reconciling custom role"
                );
                ReconciliationOutcome::Role(
                    self.role_reconciler
                        .reconcile(&definition, organization_id)
                        .await?,
                )
            }
            DefinitionDocument::Assignment(assignment) => {
                info!(
                    principal = %assignment.principal(),
                    role = assignment.role(),
                    resource = %assignment.scope(),
                    "reconciling role assignment"
                );
                ReconciliationOutcome::Assignment(
                    self.assignment_reconciler.reconcile(&assignment).await?,
                )
            }
        };

        Ok(outcome)
    }
}
