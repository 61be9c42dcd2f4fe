//! Ordered loader collection, built once at startup

use std::fmt;
use std::sync::Arc;

use super::ContentLoader;
use crate::content::ContentCategory;

/// Registered content loaders
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn ContentLoader>>,
}

impl LoaderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader
    pub fn register(&mut self, loader: Arc<dyn ContentLoader>) {
        tracing::debug!(loader = loader.name(), priority = loader.priority(), "content loader registered");
        self.loaders.push(loader);
    }

    /// Register a loader, builder style
    #[must_use]
    pub fn with(mut self, loader: Arc<dyn ContentLoader>) -> Self {
        self.register(loader);
        self
    }

    /// Number of registered loaders
    #[must_use]
    pub const fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no loader is registered
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Loaders taking part in a request for `category`
    ///
    /// The inline loader comes first. Registered loaders follow in ascending
    /// priority; equal priorities keep registration order.
    #[must_use]
    pub fn for_category(
        &self,
        category: ContentCategory,
        inline: Option<&Arc<dyn ContentLoader>>,
    ) -> Vec<Arc<dyn ContentLoader>> {
        let mut selected: Vec<Arc<dyn ContentLoader>> = self
            .loaders
            .iter()
            .filter(|loader| loader.supports(category))
            .cloned()
            .collect();
        // sort_by_key is stable
        selected.sort_by_key(|loader| loader.priority());

        match inline {
            Some(inline) => std::iter::once(inline.clone()).chain(selected).collect(),
            None => selected,
        }
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.loaders.iter().map(|loader| (loader.name(), loader.priority())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ResponseOutcome;
    use crate::context::LoadRequest;
    use crate::loader::CallbackLoader;

    fn loader(name: &str, priority: i32) -> CallbackLoader {
        CallbackLoader::from_fn(name, |_request: LoadRequest| async {
            Ok(ResponseOutcome::NotFound)
        })
        .with_priority(priority)
    }

    fn names(loaders: &[Arc<dyn ContentLoader>]) -> Vec<&str> {
        loaders.iter().map(|loader| loader.name()).collect()
    }

    #[test]
    fn test_sorted_by_priority_stable() {
        let registry = LoaderRegistry::new()
            .with(Arc::new(loader("late", 10)))
            .with(Arc::new(loader("first-zero", 0)))
            .with(Arc::new(loader("early", -5)))
            .with(Arc::new(loader("second-zero", 0)));

        let selected = registry.for_category(ContentCategory::Css, None);
        assert_eq!(names(&selected), vec!["early", "first-zero", "second-zero", "late"]);
    }

    #[test]
    fn test_inline_loader_always_first() {
        let registry = LoaderRegistry::new().with(Arc::new(loader("files", -100)));
        let inline: Arc<dyn ContentLoader> = Arc::new(loader("inline", 1000));

        let selected = registry.for_category(ContentCategory::JavaScript, Some(&inline));
        assert_eq!(names(&selected), vec!["inline", "files"]);
    }

    #[test]
    fn test_unsupported_category_filtered() {
        let registry = LoaderRegistry::new()
            .with(Arc::new(loader("js", 0).only(ContentCategory::JavaScript)))
            .with(Arc::new(loader("any", 0)));

        let selected = registry.for_category(ContentCategory::Css, None);
        assert_eq!(names(&selected), vec!["any"]);
        assert_eq!(registry.len(), 2);
    }
}
