//! Resolving the ordered file list for a `(category, theme, filter)` request

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{FileEntry, SchemaProvider, SchemaRequest};
use crate::cache::{CacheKey, CachePolicy, CachedValue};
use crate::content::ContentCategory;
use crate::error::ChameResult;
use crate::theme::Theme;

/// Turns a request into the list of files making up its bundle
#[derive(Clone)]
pub struct SchemaResolver {
    provider: Arc<dyn SchemaProvider>,
    cache: CachePolicy,
}

impl SchemaResolver {
    /// Create a resolver over a schema provider
    #[must_use]
    pub const fn new(provider: Arc<dyn SchemaProvider>, cache: CachePolicy) -> Self {
        Self { provider, cache }
    }

    /// Whether results derived from the schema may be cached
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.provider.is_cacheable()
    }

    /// Common files of `category` followed by `theme`'s files
    ///
    /// A missing schema or an undeclared theme yields an empty list (logged),
    /// never an error.
    ///
    /// # Errors
    ///
    /// Propagates provider failures: an existing schema that cannot be read or
    /// parsed.
    pub async fn resolve_files(
        &self,
        category: ContentCategory,
        theme: &Theme,
        filter: Option<&str>,
    ) -> ChameResult<Arc<[FileEntry]>> {
        let key = CacheKey::files(category, filter, Some(theme));
        if let Some(CachedValue::Files(files)) = self.cache.get(&key) {
            debug!(key = %key, "file list cache hit");
            return Ok(files);
        }

        let request = SchemaRequest {
            category,
            theme: theme.clone(),
            filter: filter.map(str::to_string),
        };
        let Some(schema) = self.provider.load_schema(&request).await? else {
            return Ok(Arc::from(Vec::new()));
        };

        let Some(files) = schema.files_for(category, theme.as_str()) else {
            warn!(theme = %theme, category = %category, "theme not declared in content schema");
            return Ok(Arc::from(Vec::new()));
        };

        let files: Arc<[FileEntry]> = Arc::from(files);
        if self.provider.is_cacheable() {
            self.cache.set(key, CachedValue::Files(files.clone()));
        }
        debug!(theme = %theme, category = %category, files = files.len(), "file list resolved");
        Ok(files)
    }
}

impl fmt::Debug for SchemaResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaResolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
