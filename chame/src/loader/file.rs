//! Loader concatenating the files declared in the content schema

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use super::ContentLoader;
use crate::cache::{CacheKey, CachePolicy, CachedValue};
use crate::content::{CachedContent, Charset, ResponseOutcome};
use crate::context::{RequestContext, RequestFilter};
use crate::error::ChameResult;
use crate::schema::{FileEntry, SchemaResolver};
use crate::storage::{FileProvider, StorageError};

/// Entries selected by a request filter
///
/// Untagged entries are selected only by unfiltered requests; tagged entries
/// only by filtered requests whose filter finds a match in the tag.
#[must_use]
pub fn select_entries<'a>(entries: &'a [FileEntry], filter: Option<&RequestFilter>) -> Vec<&'a FileEntry> {
    entries
        .iter()
        .filter(|entry| match (entry.filter.as_deref(), filter) {
            (None, None) => true,
            (Some(tag), Some(filter)) => filter.matches(tag),
            _ => false,
        })
        .collect()
}

/// Uppercase hex SHA-256 digest of a payload
#[must_use]
pub fn fingerprint(payload: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(payload))
}

/// Serves bundles built from the content schema
pub struct FileContentLoader {
    resolver: SchemaResolver,
    storage: Arc<dyn FileProvider>,
    cache: CachePolicy,
    charset: Charset,
    etag_enabled: bool,
    priority: i32,
}

impl FileContentLoader {
    /// Create a loader reading files through `storage`
    #[must_use]
    pub fn new(resolver: SchemaResolver, storage: Arc<dyn FileProvider>, cache: CachePolicy) -> Self {
        Self {
            resolver,
            storage,
            cache,
            charset: Charset::utf8(),
            etag_enabled: true,
            priority: 0,
        }
    }

    /// Encoding label of the source files
    #[must_use]
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Toggle fingerprinting
    #[must_use]
    pub const fn with_etag(mut self, enabled: bool) -> Self {
        self.etag_enabled = enabled;
        self
    }

    /// Set the invocation priority
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    async fn build(&self, ctx: &RequestContext) -> ChameResult<Option<CachedContent>> {
        let category = ctx.category();
        let entries = self
            .resolver
            .resolve_files(category, ctx.theme(), ctx.filter_pattern())
            .await?;
        let selected = select_entries(&entries, ctx.filter());
        let bundling = category.descriptor().allow_bundling;

        let mut parts: Vec<Bytes> = Vec::with_capacity(selected.len());
        for entry in selected {
            match self.storage.exists(&entry.path).await {
                Ok(true) => {}
                Ok(false) => {
                    error!(path = %entry.path, theme = %ctx.theme(), "bundle file not found; skipping");
                    continue;
                }
                Err(StorageError::InvalidPath(reason)) => {
                    error!(path = %entry.path, reason = %reason, "invalid bundle file path; skipping");
                    continue;
                }
                Err(e) => {
                    debug!(path = %entry.path, "cannot look up bundle file");
                    return Err(e.into());
                }
            }

            match self.storage.read(&entry.path).await {
                Ok(bytes) => parts.push(bytes),
                Err(StorageError::NotFound(_)) => {
                    error!(path = %entry.path, "bundle file vanished before read; skipping");
                    continue;
                }
                Err(e) => {
                    debug!(path = %entry.path, "cannot read bundle file");
                    return Err(e.into());
                }
            }

            if !bundling {
                break;
            }
        }

        if parts.is_empty() {
            return Ok(None);
        }

        let payload = Bytes::from(parts.join(&b'\n'));
        let fingerprint = self.etag_enabled.then(|| fingerprint(&payload));
        debug!(
            category = %category,
            theme = %ctx.theme(),
            files = parts.len(),
            bytes = payload.len(),
            "bundle built"
        );
        Ok(Some(CachedContent {
            payload,
            charset: self.charset.clone(),
            fingerprint,
        }))
    }
}

impl fmt::Debug for FileContentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileContentLoader")
            .field("charset", &self.charset)
            .field("etag_enabled", &self.etag_enabled)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentLoader for FileContentLoader {
    fn name(&self) -> &str {
        "files"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn load(&self, ctx: &RequestContext) -> ChameResult<ResponseOutcome> {
        let key = CacheKey::content(ctx.category(), ctx.filter_pattern(), Some(ctx.theme()));

        let content = match self.cache.get(&key) {
            Some(CachedValue::Content(content)) => {
                debug!(key = %key, "bundle cache hit");
                content
            }
            _ => {
                let Some(content) = self.build(ctx).await? else {
                    return Ok(ResponseOutcome::NotFound);
                };
                if self.resolver.is_cacheable() {
                    self.cache.set(key, CachedValue::Content(content.clone()));
                }
                content
            }
        };

        if let Some(fingerprint) = content.fingerprint.as_deref() {
            if ctx.client_etag_matches(fingerprint) {
                debug!(fingerprint, "client copy is current");
                return Ok(ResponseOutcome::NotModified {
                    fingerprint: fingerprint.to_string(),
                });
            }
        }
        Ok(content.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheMode, MemoryCache};
    use crate::config::Environment;
    use crate::content::ContentCategory;
    use crate::schema::FileSchemaProvider;
    use crate::storage::{InMemoryFileProvider, MockFileProvider};
    use crate::theme::Theme;
    use http::header::IF_NONE_MATCH;
    use http::Request;
    use std::time::Duration;

    const SCHEMA: &str = r#"{
        "cssFiles": [
            { "path": "site.css" },
            { "path": "missing.css" },
            { "path": "mobile.css", "filter": "mobile" }
        ],
        "themes": [ { "name": "Blue", "cssFiles": [ { "path": "blue.css" } ] } ]
    }"#;

    fn files() -> InMemoryFileProvider {
        InMemoryFileProvider::new()
            .with_file("chame.json", SCHEMA)
            .with_file("site.css", "body{}")
            .with_file("mobile.css", ".m{}")
            .with_file("blue.css", "a{color:blue}")
    }

    fn enabled_cache() -> CachePolicy {
        CachePolicy::new(
            Arc::new(MemoryCache::new()),
            CacheMode::Enabled,
            Environment::Production,
            Duration::from_secs(60),
        )
    }

    fn loader(storage: Arc<dyn FileProvider>, cache: CachePolicy) -> Arc<FileContentLoader> {
        let schema = FileSchemaProvider::new(Arc::new(files()), "chame.json");
        let resolver = SchemaResolver::new(Arc::new(schema), cache.clone());
        Arc::new(FileContentLoader::new(resolver, storage, cache))
    }

    fn context(loader: Arc<FileContentLoader>, filter: Option<&str>, etag: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri("/chame/css");
        if let Some(etag) = etag {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        RequestContext::new(
            parts,
            ContentCategory::Css,
            filter.map(|f| RequestFilter::new(f).unwrap()),
            Theme::new("Blue").unwrap(),
            vec![loader],
            true,
        )
        .unwrap()
    }

    fn payload(outcome: ResponseOutcome) -> String {
        match outcome {
            ResponseOutcome::Ok {
                payload: Some(payload),
                ..
            } => String::from_utf8(payload.to_vec()).unwrap(),
            other => panic!("expected content, got {other:?}"),
        }
    }

    #[test]
    fn test_select_entries() {
        let entries = vec![
            FileEntry::new("plain.css"),
            FileEntry::tagged("mobile.css", "mobile"),
            FileEntry::tagged("print.css", "print"),
        ];

        let unfiltered = select_entries(&entries, None);
        assert_eq!(unfiltered, vec![&entries[0]]);

        let mobile = RequestFilter::new("mob").unwrap();
        assert_eq!(select_entries(&entries, Some(&mobile)), vec![&entries[1]]);

        let either = RequestFilter::new("mobile|print").unwrap();
        assert_eq!(select_entries(&entries, Some(&either)).len(), 2);
    }

    #[test]
    fn test_fingerprint_is_deterministic_uppercase_hex() {
        let a = fingerprint(b"body{}");
        assert_eq!(a, fingerprint(b"body{}"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(a, fingerprint(b"body{ }"));
    }

    #[tokio::test]
    async fn test_concatenates_and_skips_missing() {
        let loader = loader(Arc::new(files()), CachePolicy::disabled());
        let ctx = context(loader.clone(), None, None);

        let outcome = loader.load(&ctx).await.unwrap();
        assert_eq!(payload(outcome), "body{}\na{color:blue}");
    }

    #[tokio::test]
    async fn test_filtered_request_selects_tagged_files() {
        let loader = loader(Arc::new(files()), CachePolicy::disabled());
        let ctx = context(loader.clone(), Some("mobile"), None);

        let outcome = loader.load(&ctx).await.unwrap();
        assert_eq!(payload(outcome), ".m{}");
    }

    #[tokio::test]
    async fn test_nothing_read_is_not_found() {
        let loader = loader(Arc::new(InMemoryFileProvider::new()), enabled_cache());
        let ctx = context(loader.clone(), None, None);

        assert_eq!(loader.load(&ctx).await.unwrap(), ResponseOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_matching_etag_is_not_modified() {
        let loader = loader(Arc::new(files()), CachePolicy::disabled());
        let expected = fingerprint(b"body{}\na{color:blue}");
        let ctx = context(loader.clone(), None, Some(&format!("\"{expected}\"")));

        let outcome = loader.load(&ctx).await.unwrap();
        assert_eq!(outcome, ResponseOutcome::NotModified { fingerprint: expected });
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let mut storage = MockFileProvider::new();
        storage.expect_exists().returning(|_| Ok(true));
        storage
            .expect_read()
            .returning(|_| Err(StorageError::Other("permission denied".to_string())));
        let loader = loader(Arc::new(storage), CachePolicy::disabled());
        let ctx = context(loader.clone(), None, None);

        assert!(loader.load(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_second_request_served_from_cache() {
        let mut storage = MockFileProvider::new();
        // One lookup and one read per existing file, across both requests
        storage.expect_exists().times(3).returning(|path| Ok(path != "missing.css"));
        storage
            .expect_read()
            .times(2)
            .returning(|path| Ok(Bytes::from(format!("/*{path}*/"))));
        let loader = loader(Arc::new(storage), enabled_cache());

        let first = loader.load(&context(loader.clone(), None, None)).await.unwrap();
        let second = loader.load(&context(loader.clone(), None, None)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(payload(first), "/*site.css*/\n/*blue.css*/");
    }
}
