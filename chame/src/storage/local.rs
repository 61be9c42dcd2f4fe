//! Local filesystem file provider

use super::traits::FileProvider;
use super::types::{normalize_path, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// Local filesystem provider rooted at a content directory
///
/// Every schema path is resolved below `base_path`; paths containing `..`
/// segments are rejected before touching the disk.
///
/// # Directory Structure
///
/// ```text
/// wwwroot/
/// ├── chame.json
/// ├── css/
/// │   ├── site.css
/// │   └── mobile.css
/// └── themes/
///     └── Blue/
///         └── blue.css
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileProvider {
    /// Content root
    base_path: PathBuf,
}

impl LocalFileProvider {
    /// Creates a new local file provider
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if `base_path` exists but is not a
    /// directory.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        // Synchronous check is fine during startup
        if base_path.exists() && !base_path.is_dir() {
            return Err(StorageError::InvalidPath(format!(
                "{} is not a directory",
                base_path.display()
            )));
        }

        Ok(Self { base_path })
    }

    /// The content root
    #[must_use]
    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    /// Full filesystem path for a schema path
    fn get_file_path(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = normalize_path(path)?;
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl FileProvider for LocalFileProvider {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let file_path = self.get_file_path(path)?;
        match fs::metadata(&file_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn read(&self, path: &str) -> StorageResult<Bytes> {
        let file_path = self.get_file_path(path)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_provider() -> (LocalFileProvider, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let provider = LocalFileProvider::new(temp_dir.path().to_path_buf()).unwrap();
        (provider, temp_dir)
    }

    #[tokio::test]
    async fn test_exists_and_read() {
        let (provider, temp) = create_test_provider();
        std::fs::create_dir_all(temp.path().join("css")).unwrap();
        std::fs::write(temp.path().join("css/site.css"), b"body{}").unwrap();

        assert!(provider.exists("/css/site.css").await.unwrap());
        assert!(provider.exists("~/css/site.css").await.unwrap());
        assert_eq!(provider.read("css/site.css").await.unwrap(), Bytes::from_static(b"body{}"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (provider, _temp) = create_test_provider();

        assert!(!provider.exists("css/none.css").await.unwrap());
        let result = provider.read("css/none.css").await;
        assert!(matches!(result.unwrap_err(), StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let (provider, temp) = create_test_provider();
        std::fs::create_dir_all(temp.path().join("css")).unwrap();

        assert!(!provider.exists("css").await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (provider, _temp) = create_test_provider();

        let result = provider.read("../outside.css").await;
        assert!(matches!(result.unwrap_err(), StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_invalid_base_path() {
        // A file where a directory is expected
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("not-a-directory");
        std::fs::write(&file_path, b"test").unwrap();

        let result = LocalFileProvider::new(file_path);
        assert!(matches!(result.unwrap_err(), StorageError::InvalidPath(_)));
    }
}
