use std::fmt::{Display, Formatter};
use std::str::FromStr;

use iamsync_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Deserializer, Serialize};

const PRINCIPAL_PREFIXES: &[&str] = &["user:", "group:", "serviceAccount:", "domain:"];
const WELL_KNOWN_PRINCIPALS: &[&str] = &["allUsers", "allAuthenticatedUsers"];

/// Identity eligible to hold a role binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Parses a principal, accepting prefixed identities and the two well-known groups.
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        if WELL_KNOWN_PRINCIPALS.contains(&value) {
            return Ok(Self(value.to_owned()));
        }

        let is_prefixed = PRINCIPAL_PREFIXES.iter().any(|prefix| {
            value
                .strip_prefix(prefix)
                .is_some_and(|identity| !identity.trim().is_empty())
        });
        if !is_prefixed {
            return Err(AppError::InvalidAssignment(format!(
                "principal '{value}' must start with one of {} or be one of {}",
                PRINCIPAL_PREFIXES.join(", "),
                WELL_KNOWN_PRINCIPALS.join(", ")
            )));
        }

        Ok(Self(value.to_owned()))
    }

    /// Returns the principal as written in policy bindings.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Resource hierarchy level an assignment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeLevel {
    /// Organization node.
    Organization,
    /// Folder node.
    Folder,
    /// Project node.
    Project,
}

impl ScopeLevel {
    /// Returns the stable level value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Folder => "folder",
            Self::Project => "project",
        }
    }

    /// Returns the resource collection prefix, including the trailing slash.
    #[must_use]
    pub fn resource_prefix(&self) -> &'static str {
        match self {
            Self::Organization => "organizations/",
            Self::Folder => "folders/",
            Self::Project => "projects/",
        }
    }
}

impl FromStr for ScopeLevel {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "organization" => Ok(Self::Organization),
            "folder" => Ok(Self::Folder),
            "project" => Ok(Self::Project),
            other => Err(AppError::InvalidScopeLevel(format!(
                "'{other}' is not one of organization, folder, project"
            ))),
        }
    }
}

impl Display for ScopeLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Maps a scope level and identifier to the provider resource path.
#[must_use]
pub fn resolve_resource_path(level: ScopeLevel, id: &str) -> String {
    format!("{}{id}", level.resource_prefix())
}

/// Resource an assignment is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentScope {
    level: ScopeLevel,
    id: NonEmptyString,
}

impl AssignmentScope {
    /// Creates a scope from a level and a non-empty identifier.
    pub fn new(level: ScopeLevel, id: impl Into<String>) -> AppResult<Self> {
        let id = NonEmptyString::new(id.into().trim())
            .map_err(|_| AppError::InvalidAssignment("scope.id is required".to_owned()))?;
        Ok(Self { level, id })
    }

    /// Returns the hierarchy level.
    #[must_use]
    pub fn level(&self) -> ScopeLevel {
        self.level
    }

    /// Returns the resource identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the resource path, e.g. `projects/p1`.
    #[must_use]
    pub fn resource_path(&self) -> String {
        resolve_resource_path(self.level, self.id.as_str())
    }
}

impl Display for AssignmentScope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.resource_path().as_str())
    }
}

/// Raw `scope` block of an assignment entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssignmentScopeInput {
    /// Hierarchy level.
    pub level: String,
    /// Resource identifier; numeric organization and folder IDs may be unquoted.
    #[serde(deserialize_with = "deserialize_resource_id")]
    pub id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResourceIdInput {
    Text(String),
    Number(u64),
}

fn deserialize_resource_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<ResourceIdInput>::deserialize(deserializer)? {
            Some(ResourceIdInput::Text(value)) => value,
            Some(ResourceIdInput::Number(value)) => value.to_string(),
            None => String::new(),
        },
    )
}

/// Raw entry under `assignments` as written in a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssignmentDefinitionInput {
    /// Principal to bind.
    pub principal: String,
    /// Role to grant.
    pub role: String,
    /// Target resource.
    pub scope: AssignmentScopeInput,
}

/// Validated single role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentDefinition {
    principal: Principal,
    role: NonEmptyString,
    scope: AssignmentScope,
}

impl AssignmentDefinition {
    /// Creates a validated assignment.
    pub fn new(input: AssignmentDefinitionInput) -> AppResult<Self> {
        let AssignmentDefinitionInput {
            principal,
            role,
            scope,
        } = input;

        for (field, value) in [
            ("principal", principal.as_str()),
            ("role", role.as_str()),
            ("scope.level", scope.level.as_str()),
            ("scope.id", scope.id.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidAssignment(format!("{field} is required")));
            }
        }

        let principal = Principal::parse(principal.as_str())?;
        let level = scope.level.parse::<ScopeLevel>()?;
        let role = NonEmptyString::new(role.trim())?;

        Ok(Self {
            principal,
            role,
            scope: AssignmentScope::new(level, scope.id)?,
        })
    }

    /// Returns the principal to bind.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the role to grant.
    #[must_use]
    pub fn role(&self) -> &str {
        self.role.as_str()
    }

    /// Returns the target resource.
    #[must_use]
    pub fn scope(&self) -> &AssignmentScope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use iamsync_core::{AppError, AppResult};

    use super::{
        AssignmentDefinition, AssignmentDefinitionInput, AssignmentScopeInput, Principal,
        ScopeLevel, resolve_resource_path,
    };

    fn input(principal: &str, level: &str) -> AssignmentDefinitionInput {
        AssignmentDefinitionInput {
            principal: principal.to_owned(),
            role: "roles/viewer".to_owned(),
            scope: AssignmentScopeInput {
                level: level.to_owned(),
                id: "p1".to_owned(),
            },
        }
    }

    #[test]
    fn principal_accepts_known_forms() {
        for value in [
            "user:a@x.com",
            "group:admins@x.com",
            "serviceAccount:ci@p1.iam.gserviceaccount.com",
            "domain:x.com",
            "allUsers",
            "allAuthenticatedUsers",
        ] {
            assert!(Principal::parse(value).is_ok(), "{value} should be accepted");
        }
    }

    #[test]
    fn principal_rejects_unknown_forms() {
        for value in ["foo:bar", "user:", "alice@x.com", "allusers"] {
            assert!(
                matches!(Principal::parse(value), Err(AppError::InvalidAssignment(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn resource_path_uses_level_prefix() {
        assert_eq!(
            resolve_resource_path(ScopeLevel::Organization, "42"),
            "organizations/42"
        );
        assert_eq!(resolve_resource_path(ScopeLevel::Folder, "7"), "folders/7");
        assert_eq!(resolve_resource_path(ScopeLevel::Project, "p1"), "projects/p1");
    }

    #[test]
    fn assignment_requires_every_field() {
        let mut missing_role = input("user:a@x.com", "project");
        missing_role.role = " ".to_owned();
        assert!(matches!(
            AssignmentDefinition::new(missing_role),
            Err(AppError::InvalidAssignment(_))
        ));

        let mut missing_scope_id = input("user:a@x.com", "project");
        missing_scope_id.scope.id = String::new();
        assert!(matches!(
            AssignmentDefinition::new(missing_scope_id),
            Err(AppError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn assignment_rejects_unknown_scope_level() {
        assert!(matches!(
            AssignmentDefinition::new(input("user:a@x.com", "billingAccount")),
            Err(AppError::InvalidScopeLevel(_))
        ));
    }

    #[test]
    fn assignment_rejects_malformed_principal() {
        assert!(matches!(
            AssignmentDefinition::new(input("foo:bar", "project")),
            Err(AppError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn valid_assignment_exposes_resource_path() -> AppResult<()> {
        let assignment = AssignmentDefinition::new(input("user:a@x.com", "project"))?;
        assert_eq!(assignment.scope().resource_path(), "projects/p1");
        assert_eq!(assignment.principal().as_str(), "user:a@x.com");
        assert_eq!(assignment.role(), "roles/viewer");
        Ok(())
    }
}
