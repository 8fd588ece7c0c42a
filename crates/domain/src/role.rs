use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use iamsync_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Fields touched when patching an existing custom role.
pub const CUSTOM_ROLE_UPDATE_MASK: &[&str] = &["title", "description", "includedPermissions"];

/// Access level embedded into every generated role description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    /// Grants elevated or sensitive access.
    Privileged,
    /// Grants day-to-day access.
    Regular,
}

impl RoleType {
    /// Returns the stable display value for this role type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Privileged => "Privileged",
            Self::Regular => "Regular",
        }
    }
}

impl FromStr for RoleType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Privileged" => Ok(Self::Privileged),
            "Regular" => Ok(Self::Regular),
            other => Err(AppError::InvalidRoleType(format!(
                "'{other}' is not one of Privileged, Regular"
            ))),
        }
    }
}

impl Display for RoleType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Launch stage of a custom role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleStage {
    /// Alpha launch stage.
    Alpha,
    /// Beta launch stage.
    Beta,
    /// Generally available.
    #[default]
    Ga,
    /// Deprecated role.
    Deprecated,
    /// Disabled role.
    Disabled,
    /// Early access preview.
    Eap,
}

impl RoleStage {
    /// Returns the provider value for this stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpha => "ALPHA",
            Self::Beta => "BETA",
            Self::Ga => "GA",
            Self::Deprecated => "DEPRECATED",
            Self::Disabled => "DISABLED",
            Self::Eap => "EAP",
        }
    }
}

impl FromStr for RoleStage {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALPHA" => Ok(Self::Alpha),
            "BETA" => Ok(Self::Beta),
            "GA" => Ok(Self::Ga),
            "DEPRECATED" => Ok(Self::Deprecated),
            "DISABLED" => Ok(Self::Disabled),
            "EAP" => Ok(Self::Eap),
            _ => Err(AppError::Validation(format!(
                "unknown role stage '{value}'"
            ))),
        }
    }
}

/// Reference to a role whose permissions are inherited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleReference {
    /// Provider-managed role, `roles/<name>`.
    Predefined {
        /// Role name without the `roles/` prefix.
        name: String,
    },
    /// Organization custom role, `organizations/<digits>/roles/<name>`.
    OrganizationCustom {
        /// Numeric organization identifier.
        organization_id: String,
        /// Role identifier inside the organization.
        role_id: String,
    },
}

impl RoleReference {
    /// Parses a role reference, rejecting any string outside the two known patterns.
    pub fn parse(value: &str) -> AppResult<Self> {
        let segments: Vec<&str> = value.split('/').collect();
        let is_name = |segment: &str| !segment.is_empty();

        match segments.as_slice() {
            ["roles", name] if is_name(name) => Ok(Self::Predefined {
                name: (*name).to_owned(),
            }),
            ["organizations", organization_id, "roles", role_id]
                if !organization_id.is_empty()
                    && organization_id.bytes().all(|byte| byte.is_ascii_digit())
                    && is_name(role_id) =>
            {
                Ok(Self::OrganizationCustom {
                    organization_id: (*organization_id).to_owned(),
                    role_id: (*role_id).to_owned(),
                })
            }
            _ => Err(AppError::MalformedRoleReference(format!(
                "'{value}' must look like 'roles/<name>' or 'organizations/<digits>/roles/<name>'"
            ))),
        }
    }

    /// Returns the full provider resource name.
    #[must_use]
    pub fn resource_name(&self) -> String {
        match self {
            Self::Predefined { name } => format!("roles/{name}"),
            Self::OrganizationCustom {
                organization_id,
                role_id,
            } => format!("organizations/{organization_id}/roles/{role_id}"),
        }
    }
}

impl Display for RoleReference {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.resource_name().as_str())
    }
}

/// Raw `customRole` block as written in a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomRoleDefinitionInput {
    /// Role identifier inside the organization.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Fallback display title, used when `title` is absent.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Access level, written as `roleType` or `role_type`.
    #[serde(alias = "role_type")]
    pub role_type: Option<String>,
    /// Explicit permissions.
    pub included_permissions: Vec<String>,
    /// Permissions removed after inheritance.
    pub excluded_permissions: Vec<String>,
    /// Roles whose permissions are inherited.
    pub base_roles: Vec<String>,
    /// Optional launch stage, `GA` when absent.
    pub stage: Option<String>,
}

/// Validated custom role definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRoleDefinition {
    id: NonEmptyString,
    title: NonEmptyString,
    description: String,
    role_type: RoleType,
    included_permissions: BTreeSet<String>,
    excluded_permissions: BTreeSet<String>,
    base_roles: Vec<RoleReference>,
    stage: RoleStage,
}

impl CustomRoleDefinition {
    /// Creates a validated custom role definition.
    pub fn new(input: CustomRoleDefinitionInput) -> AppResult<Self> {
        let CustomRoleDefinitionInput {
            id,
            title,
            name,
            description,
            role_type,
            included_permissions,
            excluded_permissions,
            base_roles,
            stage,
        } = input;

        let id = NonEmptyString::new(id.trim())
            .map_err(|_| AppError::Validation("customRole.id is required".to_owned()))?;
        if id.as_str().contains('/') {
            return Err(AppError::Validation(format!(
                "customRole.id '{id}' must not contain '/'"
            )));
        }
        let title = if title.trim().is_empty() { name } else { title };
        let title = NonEmptyString::new(title.trim()).map_err(|_| {
            AppError::Validation(format!("customRole '{id}' requires a name or title"))
        })?;
        let role_type = role_type
            .ok_or_else(|| {
                AppError::InvalidRoleType(format!("customRole '{id}' requires roleType"))
            })?
            .parse::<RoleType>()?;
        let stage = stage
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<RoleStage>())
            .transpose()?
            .unwrap_or_default();
        let base_roles = base_roles
            .iter()
            .map(|reference| RoleReference::parse(reference.trim()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            id,
            title,
            description: description.trim().to_owned(),
            role_type,
            included_permissions: normalize_permissions(included_permissions),
            excluded_permissions: normalize_permissions(excluded_permissions),
            base_roles,
            stage,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the display title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the description as written.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the access level.
    #[must_use]
    pub fn role_type(&self) -> RoleType {
        self.role_type
    }

    /// Returns the explicit permissions.
    #[must_use]
    pub fn included_permissions(&self) -> &BTreeSet<String> {
        &self.included_permissions
    }

    /// Returns the excluded permissions.
    #[must_use]
    pub fn excluded_permissions(&self) -> &BTreeSet<String> {
        &self.excluded_permissions
    }

    /// Returns the inherited role references in file order.
    #[must_use]
    pub fn base_roles(&self) -> &[RoleReference] {
        &self.base_roles
    }

    /// Returns the launch stage.
    #[must_use]
    pub fn stage(&self) -> RoleStage {
        self.stage
    }

    /// Returns the description published to the provider, prefixed with the access level.
    #[must_use]
    pub fn published_description(&self) -> String {
        if self.description.is_empty() {
            return format!("Access Level: {}.", self.role_type);
        }

        format!("Access Level: {}. {}", self.role_type, self.description)
    }

    /// Unions inherited permission sets into the explicit set and subtracts exclusions.
    pub fn resolve_permissions<I>(&self, inherited: I) -> AppResult<BTreeSet<String>>
    where
        I: IntoIterator<Item = BTreeSet<String>>,
    {
        let mut permissions = self.included_permissions.clone();
        for base_permissions in inherited {
            permissions.extend(base_permissions);
        }
        permissions.retain(|permission| !self.excluded_permissions.contains(permission));

        if permissions.is_empty() {
            return Err(AppError::EmptyPermissionSet(format!(
                "customRole '{}' resolves to no permissions; provide includedPermissions or resolvable baseRoles",
                self.id
            )));
        }

        Ok(permissions)
    }

    /// Builds the provider payload for a resolved permission set.
    #[must_use]
    pub fn payload(&self, permissions: &BTreeSet<String>) -> CustomRolePayload {
        CustomRolePayload {
            title: self.title.as_str().to_owned(),
            description: self.published_description(),
            stage: self.stage,
            included_permissions: permissions.iter().cloned().collect(),
        }
    }
}

fn normalize_permissions(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Desired custom role state sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRolePayload {
    /// Display title.
    pub title: String,
    /// Description including the access level prefix.
    pub description: String,
    /// Launch stage.
    pub stage: RoleStage,
    /// Sorted permission list.
    pub included_permissions: Vec<String>,
}

/// Custom role as currently deployed at the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteRole {
    /// Full provider resource name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Launch stage, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<RoleStage>,
    /// Deployed permissions.
    pub included_permissions: BTreeSet<String>,
    /// Provider concurrency token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Difference between a deployed role and its desired payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDelta {
    /// Permissions present in the payload but not deployed.
    pub added_permissions: BTreeSet<String>,
    /// Permissions deployed but absent from the payload.
    pub removed_permissions: BTreeSet<String>,
    /// Whether the title differs.
    pub title_changed: bool,
    /// Whether the description differs.
    pub description_changed: bool,
}

impl RoleDelta {
    /// Computes the delta from the deployed role to the desired payload.
    #[must_use]
    pub fn between(existing: &RemoteRole, desired: &CustomRolePayload) -> Self {
        let desired_permissions: BTreeSet<String> =
            desired.included_permissions.iter().cloned().collect();

        Self {
            added_permissions: desired_permissions
                .difference(&existing.included_permissions)
                .cloned()
                .collect(),
            removed_permissions: existing
                .included_permissions
                .difference(&desired_permissions)
                .cloned()
                .collect(),
            title_changed: existing.title != desired.title,
            description_changed: existing.description != desired.description,
        }
    }

    /// Returns true when a patch is required.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.added_permissions.is_empty()
            || !self.removed_permissions.is_empty()
            || self.title_changed
            || self.description_changed
    }
}
