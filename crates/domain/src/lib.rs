//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod assignment;
mod document;
mod policy;
mod role;

pub use assignment::{
    AssignmentDefinition, AssignmentDefinitionInput, AssignmentScope, AssignmentScopeInput,
    Principal, ScopeLevel, resolve_resource_path,
};
pub use document::{DefinitionDocument, DefinitionFileInput};
pub use policy::{BindingChange, PolicyBinding, PolicyDocument};
pub use role::{
    CUSTOM_ROLE_UPDATE_MASK, CustomRoleDefinition, CustomRoleDefinitionInput, CustomRolePayload,
    RemoteRole, RoleDelta, RoleReference, RoleStage, RoleType,
};
