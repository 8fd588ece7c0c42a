//! Shared primitives for all Rust crates in iamsync.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across iamsync crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Numeric organization identifier that scopes custom roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(String);

impl OrganizationId {
    /// Creates an organization identifier, rejecting anything but ASCII digits.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "organization id '{value}' must be a non-empty string of digits"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `organizations/{id}` resource name.
    #[must_use]
    pub fn resource_name(&self) -> String {
        format!("organizations/{}", self.0)
    }
}

impl FromStr for OrganizationId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl Display for OrganizationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant not covered by a narrower category.
    #[error("validation error: {0}")]
    Validation(String),

    /// Definition file or remote resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Definition file is empty after trimming whitespace.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Definition file is not a recognized role or assignment document.
    #[error("unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// Role type is outside the closed set of access levels.
    #[error("invalid role type: {0}")]
    InvalidRoleType(String),

    /// Resolved permission set is empty after exclusions.
    #[error("empty permission set: {0}")]
    EmptyPermissionSet(String),

    /// Assignment definition is incomplete or names an invalid principal.
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    /// Assignment scope level is not organization, folder or project.
    #[error("invalid scope level: {0}")]
    InvalidScopeLevel(String),

    /// Base role reference does not match a known role name pattern.
    #[error("malformed role reference: {0}")]
    MalformedRoleReference(String),

    /// Identity provider call failed for a reason other than absence.
    #[error("transport error: {0}")]
    Transport(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
