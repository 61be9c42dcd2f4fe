//! Closure-backed loader

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::ContentLoader;
use crate::content::{ContentCategory, ResponseOutcome};
use crate::context::{LoadRequest, RequestContext};
use crate::error::ChameResult;

/// Application callback producing content
pub type LoaderCallback =
    Arc<dyn Fn(LoadRequest) -> BoxFuture<'static, ChameResult<ResponseOutcome>> + Send + Sync>;

/// Loader delegating to an application closure
///
/// Used for the inline loader, which always runs before the registered ones,
/// and for ad-hoc loaders registered alongside the file loader.
pub struct CallbackLoader {
    name: String,
    priority: i32,
    categories: Option<Vec<ContentCategory>>,
    callback: LoaderCallback,
}

impl CallbackLoader {
    /// Wrap a callback
    #[must_use]
    pub fn new(name: impl Into<String>, callback: LoaderCallback) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            categories: None,
            callback,
        }
    }

    /// Wrap an async closure
    #[must_use]
    pub fn from_fn<F, Fut>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(LoadRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ChameResult<ResponseOutcome>> + Send + 'static,
    {
        Self::new(name, Arc::new(move |request| Box::pin(callback(request))))
    }

    /// Set the invocation priority
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restrict the loader to one category (may be called repeatedly)
    #[must_use]
    pub fn only(mut self, category: ContentCategory) -> Self {
        self.categories.get_or_insert_with(Vec::new).push(category);
        self
    }
}

impl fmt::Debug for CallbackLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLoader")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ContentLoader for CallbackLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports(&self, category: ContentCategory) -> bool {
        self.categories
            .as_ref()
            .is_none_or(|categories| categories.contains(&category))
    }

    async fn load(&self, ctx: &RequestContext) -> ChameResult<ResponseOutcome> {
        (self.callback)(ctx.to_load_request()).await
    }
}
