use iamsync_core::{AppError, AppResult};
use serde::Deserialize;

use crate::{
    AssignmentDefinition, AssignmentDefinitionInput, CustomRoleDefinition,
    CustomRoleDefinitionInput,
};

/// Top-level keys of a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionFileInput {
    /// Custom role block.
    #[serde(default)]
    pub custom_role: Option<CustomRoleDefinitionInput>,
    /// Assignment entries; exactly one is accepted.
    #[serde(default)]
    pub assignments: Option<Vec<AssignmentDefinitionInput>>,
}

/// A parsed and validated definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionDocument {
    /// File declares a custom role.
    Role(CustomRoleDefinition),
    /// File declares a single role assignment.
    Assignment(AssignmentDefinition),
}

impl DefinitionDocument {
    /// Routes a raw file to its document kind; `customRole` wins when both keys exist.
    pub fn from_input(input: DefinitionFileInput, source: &str) -> AppResult<Self> {
        match (input.custom_role, input.assignments) {
            (Some(custom_role), _) => Ok(Self::Role(CustomRoleDefinition::new(custom_role)?)),
            (None, Some(mut assignments)) => {
                if assignments.len() != 1 {
                    return Err(AppError::InvalidAssignment(format!(
                        "'{source}' must contain exactly one entry under 'assignments', found {}",
                        assignments.len()
                    )));
                }
                let assignment = assignments.remove(0);
                Ok(Self::Assignment(AssignmentDefinition::new(assignment)?))
            }
            (None, None) => Err(AppError::UnrecognizedFormat(format!(
                "'{source}' has neither a 'customRole' nor an 'assignments' key"
            ))),
        }
    }

    /// Returns a stable label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "custom_role",
            Self::Assignment(_) => "assignment",
        }
    }
}
