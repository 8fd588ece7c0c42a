use std::path::Path;

use async_trait::async_trait;
use iamsync_core::AppResult;

/// Port for reading definition files.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Returns whether a file exists at `path`.
    async fn exists(&self, path: &Path) -> AppResult<bool>;

    /// Reads the whole file at `path` as UTF-8.
    async fn read_to_string(&self, path: &Path) -> AppResult<String>;
}
