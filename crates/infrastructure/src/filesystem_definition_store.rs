//! Filesystem-backed definition store.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use iamsync_application::DefinitionStore;
use iamsync_core::{AppError, AppResult};

/// Reads definition files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemDefinitionStore;

impl FileSystemDefinitionStore {
    /// Creates a filesystem store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DefinitionStore for FileSystemDefinitionStore {
    async fn exists(&self, path: &Path) -> AppResult<bool> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) => Err(AppError::Internal(format!(
                "failed to inspect '{}': {error}",
                path.display()
            ))),
        }
    }

    async fn read_to_string(&self, path: &Path) -> AppResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => {
                    AppError::NotFound(format!("file '{}' not found", path.display()))
                }
                ErrorKind::InvalidData => AppError::UnrecognizedFormat(format!(
                    "file '{}' is not valid UTF-8",
                    path.display()
                )),
                _ => AppError::Internal(format!(
                    "failed to read '{}': {error}",
                    path.display()
                )),
            })
    }
}
