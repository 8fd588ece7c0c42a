use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use iamsync_core::{AppError, AppResult};
use iamsync_domain::{DefinitionDocument, DefinitionFileInput};
use tracing::info;

use crate::DefinitionStore;

/// Locates, reads and parses definition files.
#[derive(Clone)]
pub struct DefinitionLoader {
    store: Arc<dyn DefinitionStore>,
    search_directories: Vec<PathBuf>,
}

impl DefinitionLoader {
    /// Creates a loader searching the role definitions directory before the assignments directory.
    #[must_use]
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        definitions_directory: impl Into<PathBuf>,
        assignments_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            search_directories: vec![definitions_directory.into(), assignments_directory.into()],
        }
    }

    /// Returns the first existing candidate path for `file_name`.
    pub async fn resolve_path(&self, file_name: &str) -> AppResult<PathBuf> {
        let relative = Path::new(file_name.trim());
        let is_plain_relative = !relative.as_os_str().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain_relative {
            return Err(AppError::Validation(format!(
                "definition file name '{file_name}' must be a relative path inside the search directories"
            )));
        }

        for directory in &self.search_directories {
            let candidate = directory.join(relative);
            if self.store.exists(candidate.as_path()).await? {
                return Ok(candidate);
            }
        }

        let searched = self
            .search_directories
            .iter()
            .map(|directory| directory.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(AppError::NotFound(format!(
            "definition file '{file_name}' not found in {searched}"
        )))
    }

    /// Loads and validates the definition stored under `file_name`.
    pub async fn load(&self, file_name: &str) -> AppResult<DefinitionDocument> {
        let path = self.resolve_path(file_name).await?;
        info!(path = %path.display(), "processing definition file");

        let contents = self.store.read_to_string(path.as_path()).await?;
        let source = path.display().to_string();
        let document = parse_definition(contents.as_str(), source.as_str())?;

        info!(
            path = %source,
            kind = document.kind(),
            "definition file parsed"
        );
        Ok(document)
    }
}

/// Parses YAML definition contents into a validated document.
pub fn parse_definition(contents: &str, source: &str) -> AppResult<DefinitionDocument> {
    if contents.trim().is_empty() {
        return Err(AppError::EmptyInput(format!(
            "definition file '{source}' is empty"
        )));
    }

    let value: serde_yaml::Value = serde_yaml::from_str(contents).map_err(|error| {
        AppError::UnrecognizedFormat(format!("'{source}' is not valid YAML: {error}"))
    })?;
    if !value.is_mapping() {
        return Err(AppError::UnrecognizedFormat(format!(
            "'{source}' must contain a mapping at the top level"
        )));
    }

    let is_role = value.get("customRole").is_some_and(|role| !role.is_null());
    let input: DefinitionFileInput = serde_yaml::from_value(value).map_err(|error| {
        let message = format!("'{source}' has an invalid field: {error}");
        if is_role {
            AppError::Validation(message)
        } else {
            AppError::InvalidAssignment(message)
        }
    })?;

    DefinitionDocument::from_input(input, source)
}
