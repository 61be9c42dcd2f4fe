//! Sources of the content schema
//!
//! The schema comes either from a JSON resource read through a
//! [`FileProvider`] or from an application callback. The choice is made once,
//! when the state is built.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use super::ContentSchema;
use crate::content::ContentCategory;
use crate::error::ChameResult;
use crate::storage::FileProvider;
use crate::theme::Theme;

/// What the schema is being loaded for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRequest {
    /// Requested category
    pub category: ContentCategory,
    /// Resolved theme
    pub theme: Theme,
    /// Request filter, if any
    pub filter: Option<String>,
}

/// Loads the content schema
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Load the schema for a request
    ///
    /// `Ok(None)` means no schema is available (logged by the provider);
    /// callers treat it as an empty file list.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing schema resource cannot be read or
    /// parsed.
    async fn load_schema(&self, request: &SchemaRequest) -> ChameResult<Option<ContentSchema>>;

    /// Whether results derived from this provider may be cached
    fn is_cacheable(&self) -> bool {
        true
    }
}

/// Reads the schema from a JSON resource
pub struct FileSchemaProvider {
    storage: Arc<dyn FileProvider>,
    path: String,
}

impl FileSchemaProvider {
    /// Create a provider reading `path` through `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn FileProvider>, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }

    /// Path of the schema resource
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for FileSchemaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSchemaProvider")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SchemaProvider for FileSchemaProvider {
    async fn load_schema(&self, request: &SchemaRequest) -> ChameResult<Option<ContentSchema>> {
        let exists = self.storage.exists(&self.path).await.inspect_err(|_| {
            debug!(path = %self.path, "cannot look up content schema");
        })?;
        if !exists {
            error!(path = %self.path, "content schema not found; serving no files");
            return Ok(None);
        }

        let bytes = self.storage.read(&self.path).await.inspect_err(|_| {
            debug!(path = %self.path, "cannot read content schema");
        })?;
        let schema = ContentSchema::from_json(&bytes).inspect_err(|_| {
            debug!(path = %self.path, "cannot parse content schema");
        })?;

        debug!(
            path = %self.path,
            theme = %request.theme,
            themes = schema.themes.len(),
            "content schema loaded"
        );
        Ok(Some(schema))
    }
}

/// Application callback producing the schema
pub type SchemaCallback =
    Arc<dyn Fn(SchemaRequest) -> BoxFuture<'static, Option<ContentSchema>> + Send + Sync>;

/// Asks the application for the schema on every request
///
/// The callback may return request-dependent data, so its results are never
/// cached.
pub struct CallbackSchemaProvider {
    callback: SchemaCallback,
}

impl CallbackSchemaProvider {
    /// Wrap a callback
    #[must_use]
    pub const fn new(callback: SchemaCallback) -> Self {
        Self { callback }
    }

    /// Wrap an async closure
    #[must_use]
    pub fn from_fn<F, Fut>(callback: F) -> Self
    where
        F: Fn(SchemaRequest) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Option<ContentSchema>> + Send + 'static,
    {
        Self::new(Arc::new(move |request| Box::pin(callback(request))))
    }
}

impl fmt::Debug for CallbackSchemaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSchemaProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl SchemaProvider for CallbackSchemaProvider {
    async fn load_schema(&self, request: &SchemaRequest) -> ChameResult<Option<ContentSchema>> {
        let schema = (self.callback)(request.clone()).await;
        if schema.is_none() {
            error!(theme = %request.theme, category = %request.category, "schema callback returned nothing");
        }
        Ok(schema)
    }

    fn is_cacheable(&self) -> bool {
        false
    }
}
