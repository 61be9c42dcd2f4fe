//! File provider trait definitions

use super::types::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Read-only access to the files a content schema refers to
///
/// Paths are the raw strings found in the schema; implementations normalize
/// them with [`normalize_path`](super::normalize_path).
///
/// # Examples
///
/// ```rust,no_run
/// use chame::storage::{FileProvider, LocalFileProvider};
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let provider = LocalFileProvider::new(PathBuf::from("./wwwroot"))?;
///
/// if provider.exists("/css/site.css").await? {
///     let bytes = provider.read("/css/site.css").await?;
///     println!("read {} bytes", bytes.len());
/// }
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Returns whether a file exists at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend cannot be queried.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Reads the whole file at `path`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the file is absent, or an I/O error
    /// if it cannot be read.
    async fn read(&self, path: &str) -> StorageResult<Bytes>;
}
