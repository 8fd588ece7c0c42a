//! Application services and ports.

#![forbid(unsafe_code)]

mod assignment_reconciler;
mod definition_loader;
mod definition_ports;
mod identity_provider_ports;
mod reconciliation_dispatcher;
mod role_reconciler;

#[cfg(test)]
mod test_support;

pub use assignment_reconciler::{AssignmentOutcome, AssignmentReconciler};
pub use definition_loader::{DefinitionLoader, parse_definition};
pub use definition_ports::DefinitionStore;
pub use identity_provider_ports::IdentityProviderClient;
pub use reconciliation_dispatcher::{ReconciliationDispatcher, ReconciliationOutcome};
pub use role_reconciler::{RoleReconcileOutcome, RoleReconciler};
