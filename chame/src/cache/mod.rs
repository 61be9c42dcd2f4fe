//! In-memory result cache with absolute expiration
//!
//! One cache instance is shared by every request. It holds two kinds of
//! results, both keyed by `(category, filter, theme)`:
//!
//! - the merged file list produced by the schema resolver
//! - the concatenated bundle produced by the file loader
//!
//! Entries expire at an absolute deadline fixed on insertion. There is no
//! sliding expiration and no invalidation API; a changed source file is
//! picked up once its entry expires.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::Environment;
use crate::content::{CachedContent, ContentCategory};
use crate::schema::FileEntry;
use crate::theme::Theme;

/// Placeholder used in keys for an absent filter or theme
const NONE_SENTINEL: &str = "none";

/// Whether results are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Never cache
    Disabled,
    /// Always cache
    Enabled,
    /// Cache everywhere except in the development environment
    #[default]
    EnabledExceptInDevelopment,
}

impl CacheMode {
    /// Effective caching flag for the given environment
    #[must_use]
    pub const fn is_enabled(self, environment: Environment) -> bool {
        match self {
            Self::Disabled => false,
            Self::Enabled => true,
            Self::EnabledExceptInDevelopment => !matches!(environment, Environment::Development),
        }
    }
}

/// Which kind of result a key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Resolved file list
    Files,
    /// Concatenated bundle
    Content,
}

impl CacheKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Content => "content",
        }
    }
}

/// Composite cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: CacheKind,
    category: ContentCategory,
    filter: Option<String>,
    theme: Option<Theme>,
}

impl CacheKey {
    /// Build a key
    ///
    /// An absent filter or theme is distinct from every present value,
    /// including the literal text `none`; the sentinel only appears when the
    /// key is rendered.
    #[must_use]
    pub fn new(
        kind: CacheKind,
        category: ContentCategory,
        filter: Option<&str>,
        theme: Option<&Theme>,
    ) -> Self {
        Self {
            kind,
            category,
            filter: filter.map(str::to_string),
            theme: theme.cloned(),
        }
    }

    /// Key for a resolved file list
    #[must_use]
    pub fn files(category: ContentCategory, filter: Option<&str>, theme: Option<&Theme>) -> Self {
        Self::new(CacheKind::Files, category, filter, theme)
    }

    /// Key for a concatenated bundle
    #[must_use]
    pub fn content(category: ContentCategory, filter: Option<&str>, theme: Option<&Theme>) -> Self {
        Self::new(CacheKind::Content, category, filter, theme)
    }

    /// Kind of result this key refers to
    #[must_use]
    pub const fn kind(&self) -> CacheKind {
        self.kind
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.kind.as_str(),
            self.category,
            self.filter.as_deref().unwrap_or(NONE_SENTINEL),
            self.theme.as_ref().map_or(NONE_SENTINEL, Theme::as_str)
        )
    }
}

/// A cached result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    /// Resolved file list
    Files(Arc<[FileEntry]>),
    /// Concatenated bundle
    Content(CachedContent),
}

/// Key/value store with per-entry absolute TTL
///
/// Implementations must be safe for concurrent use; callers add no locking.
pub trait Cache: Send + Sync {
    /// Look up a live entry
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// Insert an entry that expires `ttl` from now
    fn set(&self, key: CacheKey, value: CachedValue, ttl: Duration);
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

/// Entry count above which an insert first sweeps expired entries
pub const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

/// Process-wide in-memory cache
///
/// Expired entries are dropped when read, and swept in bulk by
/// [`MemoryCache::purge_expired`], which `set` runs on its own whenever the
/// map has grown past the sweep threshold. Live entries are never evicted.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    sweep_threshold: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_sweep_threshold(DEFAULT_SWEEP_THRESHOLD)
    }
}

impl MemoryCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache that sweeps once it holds `threshold` entries
    #[must_use]
    pub fn with_sweep_threshold(threshold: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sweep_threshold: threshold,
        }
    }

    /// Drop every expired entry, returning how many were removed
    #[must_use]
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless a concurrent writer already refreshed it
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
            tracing::trace!(key = %key, "cache entry expired");
        }
        None
    }

    fn set(&self, key: CacheKey, value: CachedValue, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write();
        if entries.len() >= self.sweep_threshold {
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            tracing::trace!(removed = before - entries.len(), "swept expired cache entries");
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

/// A cache together with the effective caching switch and TTL
///
/// Components that cache (the schema resolver and the file loader) hold a
/// `CachePolicy` rather than the raw cache, so the on/off decision lives in one
/// place.
#[derive(Clone)]
pub struct CachePolicy {
    cache: Arc<dyn Cache>,
    mode: CacheMode,
    environment: Environment,
    ttl: Duration,
}

impl CachePolicy {
    /// Create a policy over `cache`
    #[must_use]
    pub const fn new(cache: Arc<dyn Cache>, mode: CacheMode, environment: Environment, ttl: Duration) -> Self {
        Self {
            cache,
            mode,
            environment,
            ttl,
        }
    }

    /// A policy that never caches
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(
            Arc::new(MemoryCache::new()),
            CacheMode::Disabled,
            Environment::default(),
            Duration::ZERO,
        )
    }

    /// Whether caching is currently in effect
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mode.is_enabled(self.environment)
    }

    /// Entry lifetime
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key` when caching is enabled
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        if !self.is_enabled() {
            return None;
        }
        self.cache.get(key)
    }

    /// Store `value` when caching is enabled
    pub fn set(&self, key: CacheKey, value: CachedValue) {
        if self.is_enabled() {
            self.cache.set(key, value, self.ttl);
        }
    }
}

impl fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicy")
            .field("mode", &self.mode)
            .field("environment", &self.environment)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Charset;
    use bytes::Bytes;

    fn content(text: &'static str) -> CachedValue {
        CachedValue::Content(CachedContent {
            payload: Bytes::from_static(text.as_bytes()),
            charset: Charset::utf8(),
            fingerprint: None,
        })
    }

    #[test]
    fn test_mode_environment_matrix() {
        for env in [Environment::Development, Environment::Staging, Environment::Production] {
            assert!(!CacheMode::Disabled.is_enabled(env));
            assert!(CacheMode::Enabled.is_enabled(env));
        }
        assert!(!CacheMode::EnabledExceptInDevelopment.is_enabled(Environment::Development));
        assert!(CacheMode::EnabledExceptInDevelopment.is_enabled(Environment::Staging));
        assert!(CacheMode::EnabledExceptInDevelopment.is_enabled(Environment::Production));
    }

    #[test]
    fn test_key_rendering_uses_sentinel() {
        let theme = Theme::new("Blue").unwrap();
        let key = CacheKey::content(ContentCategory::Css, None, Some(&theme));
        assert_eq!(key.to_string(), "content|css|none|Blue");

        let key = CacheKey::files(ContentCategory::JavaScript, Some("mobile"), None);
        assert_eq!(key.to_string(), "files|js|mobile|none");
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let files = CacheKey::files(ContentCategory::Css, None, None);
        let content = CacheKey::content(ContentCategory::Css, None, None);
        assert_ne!(files, content);
    }

    #[test]
    fn test_literal_none_is_not_absent() {
        let theme = Theme::new("Blue").unwrap();
        let literal = CacheKey::content(ContentCategory::Css, Some("none"), Some(&theme));
        let absent = CacheKey::content(ContentCategory::Css, None, Some(&theme));
        assert_ne!(literal, absent);

        let cache = MemoryCache::new();
        cache.set(absent, content("body{}"), Duration::from_secs(60));
        assert!(cache.get(&literal).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new();
        let key = CacheKey::content(ContentCategory::Css, None, None);
        cache.set(key.clone(), content("a{}"), Duration::from_secs(60));

        assert_eq!(cache.get(&key), Some(content("a{}")));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&key).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set(
            CacheKey::content(ContentCategory::Css, None, None),
            content("short"),
            Duration::from_secs(1),
        );
        cache.set(
            CacheKey::content(ContentCategory::JavaScript, None, None),
            content("long"),
            Duration::from_secs(100),
        );

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_sweeps_past_threshold() {
        let cache = MemoryCache::with_sweep_threshold(3);
        for filter in ["a", "b", "c"] {
            cache.set(
                CacheKey::content(ContentCategory::Css, Some(filter), None),
                content("x"),
                Duration::from_secs(1),
            );
        }
        assert_eq!(cache.len(), 3);

        tokio::time::advance(Duration::from_secs(5)).await;
        cache.set(
            CacheKey::content(ContentCategory::Css, Some("d"), None),
            content("y"),
            Duration::from_secs(60),
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disabled_policy_never_stores() {
        let cache = Arc::new(MemoryCache::new());
        let policy = CachePolicy::new(
            cache.clone(),
            CacheMode::EnabledExceptInDevelopment,
            Environment::Development,
            Duration::from_secs(60),
        );
        let key = CacheKey::content(ContentCategory::Css, None, None);

        policy.set(key.clone(), content("x"));
        assert!(cache.is_empty());
        assert!(policy.get(&key).is_none());
    }

    #[test]
    fn test_enabled_policy_round_trip() {
        let cache = Arc::new(MemoryCache::new());
        let policy = CachePolicy::new(
            cache.clone(),
            CacheMode::Enabled,
            Environment::Development,
            Duration::from_secs(60),
        );
        let key = CacheKey::content(ContentCategory::Css, None, None);

        policy.set(key.clone(), content("x"));
        assert_eq!(cache.len(), 1);
        assert_eq!(policy.get(&key), Some(content("x")));
    }
}
