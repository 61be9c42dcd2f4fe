//! Application state management
//!
//! [`ChameState`] is built once at startup and shared by every request. It
//! owns the configuration, the cache, the ordered loader registry and the
//! application callbacks; cloning it is cheap.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Cache, CachePolicy, MemoryCache};
use crate::config::ChameConfig;
use crate::content::{Charset, ContentCategory};
use crate::context::LoadRequest;
use crate::error::{ChameError, ChameResult};
use crate::loader::{ContentLoader, FileContentLoader, LoaderRegistry};
use crate::schema::{FileSchemaProvider, SchemaProvider, SchemaResolver};
use crate::storage::{FileProvider, LocalFileProvider};
use crate::theme::{
    ChainThemeResolver, CookieThemeResolver, ExtensionThemeResolver, Theme, ThemeResolver,
};

/// Callback producing default content when no loader has any
pub type NotFoundCallback =
    Arc<dyn Fn(LoadRequest) -> BoxFuture<'static, Option<Bytes>> + Send + Sync>;

/// Shared state of the bundling middleware
///
/// # Example
///
/// ```rust,no_run
/// use chame::config::ChameConfig;
/// use chame::state::ChameState;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = ChameConfig::load_from("./chame.toml")?;
/// let state = ChameState::from_config(config, "./wwwroot")?;
/// assert!(state.config().bundle.etag_enabled);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChameState {
    inner: Arc<StateInner>,
}

struct StateInner {
    config: ChameConfig,
    default_theme: Option<Theme>,
    charset: Charset,
    cache: CachePolicy,
    loaders: LoaderRegistry,
    theme_resolver: Arc<dyn ThemeResolver>,
    inline_loader: Option<Arc<dyn ContentLoader>>,
    not_found: Option<NotFoundCallback>,
}

impl ChameState {
    /// Start building state from a configuration
    #[must_use]
    pub const fn builder(config: ChameConfig) -> ChameStateBuilder {
        ChameStateBuilder::new(config)
    }

    /// State serving files below `root` with the default pipeline
    ///
    /// Wires a [`LocalFileProvider`], a [`FileSchemaProvider`] reading the
    /// configured schema path, the in-memory cache and the file loader.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a usable directory or the
    /// configuration is invalid.
    pub fn from_config(config: ChameConfig, root: impl Into<PathBuf>) -> ChameResult<Self> {
        let storage = LocalFileProvider::new(root.into())?;
        Self::builder(config).storage(Arc::new(storage)).build()
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ChameConfig {
        &self.inner.config
    }

    /// Validated default theme
    #[must_use]
    pub fn default_theme(&self) -> Option<&Theme> {
        self.inner.default_theme.as_ref()
    }

    /// Encoding of synthesized content
    #[must_use]
    pub fn charset(&self) -> &Charset {
        &self.inner.charset
    }

    /// Cache shared by the pipeline
    #[must_use]
    pub fn cache(&self) -> &CachePolicy {
        &self.inner.cache
    }

    /// Registered loaders
    #[must_use]
    pub fn loaders(&self) -> &LoaderRegistry {
        &self.inner.loaders
    }

    /// Theme resolver consulted for every request
    #[must_use]
    pub fn theme_resolver(&self) -> &dyn ThemeResolver {
        self.inner.theme_resolver.as_ref()
    }

    /// Loaders taking part in a request for `category`, in invocation order
    #[must_use]
    pub fn loaders_for(&self, category: ContentCategory) -> Vec<Arc<dyn ContentLoader>> {
        self.inner
            .loaders
            .for_category(category, self.inner.inline_loader.as_ref())
    }

    /// Ask the application for default content
    pub async fn content_not_found(&self, request: LoadRequest) -> Option<Bytes> {
        let callback = self.inner.not_found.as_ref()?;
        callback(request).await
    }
}

impl fmt::Debug for ChameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChameState")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache)
            .field("loaders", &self.inner.loaders)
            .field("inline_loader", &self.inner.inline_loader.as_ref().map(|l| l.name().to_string()))
            .field("not_found", &self.inner.not_found.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ChameState`]
pub struct ChameStateBuilder {
    config: ChameConfig,
    storage: Option<Arc<dyn FileProvider>>,
    cache: Option<Arc<dyn Cache>>,
    schema_provider: Option<Arc<dyn SchemaProvider>>,
    file_loader: bool,
    loaders: Vec<Arc<dyn ContentLoader>>,
    theme_resolver: Option<Arc<dyn ThemeResolver>>,
    inline_loader: Option<Arc<dyn ContentLoader>>,
    not_found: Option<NotFoundCallback>,
}

impl ChameStateBuilder {
    /// Create a builder
    #[must_use]
    pub const fn new(config: ChameConfig) -> Self {
        Self {
            config,
            storage: None,
            cache: None,
            schema_provider: None,
            file_loader: true,
            loaders: Vec::new(),
            theme_resolver: None,
            inline_loader: None,
            not_found: None,
        }
    }

    /// File provider for the schema and the bundle files
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn FileProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the in-memory cache
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the JSON schema resource with another provider
    #[must_use]
    pub fn schema_provider(mut self, provider: Arc<dyn SchemaProvider>) -> Self {
        self.schema_provider = Some(provider);
        self
    }

    /// Do not register the built-in file loader
    #[must_use]
    pub const fn without_file_loader(mut self) -> Self {
        self.file_loader = false;
        self
    }

    /// Register an additional loader
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn ContentLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Replace the configured theme resolver
    #[must_use]
    pub fn theme_resolver(mut self, resolver: impl ThemeResolver + 'static) -> Self {
        self.theme_resolver = Some(Arc::new(resolver));
        self
    }

    /// Loader invoked before all registered loaders
    #[must_use]
    pub fn inline_loader(mut self, loader: Arc<dyn ContentLoader>) -> Self {
        self.inline_loader = Some(loader);
        self
    }

    /// Callback producing content when no loader has any
    #[must_use]
    pub fn not_found<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(LoadRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Bytes>> + Send + 'static,
    {
        self.not_found = Some(Arc::new(move |request| Box::pin(callback(request))));
        self
    }

    /// Build the state
    ///
    /// # Errors
    ///
    /// Returns [`ChameError::Config`] if the configuration is invalid or the
    /// file loader is enabled without a file provider.
    pub fn build(self) -> ChameResult<ChameState> {
        self.config.validate()?;

        let default_theme = self
            .config
            .bundle
            .default_theme
            .as_deref()
            .map(Theme::new)
            .transpose()?;
        let charset = Charset::new(self.config.bundle.charset.clone());
        let cache = CachePolicy::new(
            self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new())),
            self.config.cache.mode,
            self.config.environment,
            Duration::from_secs(self.config.cache.ttl_secs),
        );

        let mut loaders = LoaderRegistry::new();
        if self.file_loader {
            let storage = self.storage.ok_or_else(|| {
                ChameError::Config("the file loader requires a file provider".to_string())
            })?;
            let schema_provider = self.schema_provider.unwrap_or_else(|| {
                Arc::new(FileSchemaProvider::new(
                    storage.clone(),
                    self.config.bundle.schema_path.clone(),
                ))
            });
            let resolver = SchemaResolver::new(schema_provider, cache.clone());
            let file_loader = FileContentLoader::new(resolver, storage, cache.clone())
                .with_charset(charset.clone())
                .with_etag(self.config.bundle.etag_enabled)
                .with_priority(self.config.bundle.file_loader_priority);
            loaders.register(Arc::new(file_loader));
        }
        for loader in self.loaders {
            loaders.register(loader);
        }

        let theme_resolver = self
            .theme_resolver
            .unwrap_or_else(|| default_theme_resolver(&self.config));

        tracing::info!(
            environment = %self.config.environment,
            caching = cache.is_enabled(),
            loaders = loaders.len(),
            js_path = %self.config.bundle.js_path,
            css_path = %self.config.bundle.css_path,
            "chame state initialized"
        );

        Ok(ChameState {
            inner: Arc::new(StateInner {
                config: self.config,
                default_theme,
                charset,
                cache,
                loaders,
                theme_resolver,
                inline_loader: self.inline_loader,
                not_found: self.not_found,
            }),
        })
    }
}

impl fmt::Debug for ChameStateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChameStateBuilder")
            .field("config", &self.config)
            .field("file_loader", &self.file_loader)
            .field("loaders", &self.loaders.len())
            .finish_non_exhaustive()
    }
}

/// Request extension first, then the theme cookie when one is configured
fn default_theme_resolver(config: &ChameConfig) -> Arc<dyn ThemeResolver> {
    let mut chain = ChainThemeResolver::new().with(ExtensionThemeResolver);
    if let Some(cookie) = &config.bundle.theme_cookie {
        chain = chain.with(CookieThemeResolver::new(cookie.clone()));
    }
    Arc::new(chain)
}
