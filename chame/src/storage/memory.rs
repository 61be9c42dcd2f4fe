//! In-memory file provider

use super::traits::FileProvider;
use super::types::{normalize_path, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// File provider backed by a map, for embedded assets and tests
#[derive(Debug, Default)]
pub struct InMemoryFileProvider {
    files: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryFileProvider {
    /// Create an empty provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if the path cannot be normalized.
    pub fn insert(&self, path: &str, content: impl Into<Bytes>) -> StorageResult<()> {
        let key = normalize_path(path)?;
        self.files.write().insert(key, content.into());
        Ok(())
    }

    /// Builder-style variant of [`insert`](Self::insert)
    ///
    /// # Panics
    ///
    /// Panics if the path cannot be normalized.
    #[must_use]
    pub fn with_file(self, path: &str, content: impl Into<Bytes>) -> Self {
        if let Err(e) = self.insert(path, content) {
            panic!("invalid in-memory file path {path:?}: {e}");
        }
        self
    }
}

#[async_trait]
impl FileProvider for InMemoryFileProvider {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let key = normalize_path(path)?;
        Ok(self.files.read().contains_key(&key))
    }

    async fn read(&self, path: &str) -> StorageResult<Bytes> {
        let key = normalize_path(path)?;
        self.files
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_read() {
        let provider = InMemoryFileProvider::new().with_file("/js/app.js", "let a = 1;");

        assert!(provider.exists("js/app.js").await.unwrap());
        assert_eq!(provider.read("~/js/app.js").await.unwrap(), Bytes::from("let a = 1;"));
    }

    #[tokio::test]
    async fn test_missing() {
        let provider = InMemoryFileProvider::new();

        assert!(!provider.exists("js/app.js").await.unwrap());
        assert!(matches!(
            provider.read("js/app.js").await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }
}
