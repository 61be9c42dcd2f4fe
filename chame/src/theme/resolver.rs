//! Per-request theme resolution
//!
//! A [`ThemeResolver`] inspects the inbound request and may name a theme. The
//! middleware validates the name and falls back to the configured default theme
//! when the resolver returns nothing usable.

use axum_extra::extract::cookie::CookieJar;
use http::request::Parts;
use std::sync::Arc;

use super::{is_valid_theme_name, Theme};

/// Derives a theme name from the inbound request
///
/// Any `Fn(&Parts) -> Option<String>` closure is a resolver.
pub trait ThemeResolver: Send + Sync {
    /// Returns the requested theme name, if the request carries one
    fn resolve_theme(&self, parts: &Parts) -> Option<String>;
}

impl<F> ThemeResolver for F
where
    F: Fn(&Parts) -> Option<String> + Send + Sync,
{
    fn resolve_theme(&self, parts: &Parts) -> Option<String> {
        self(parts)
    }
}

/// Reads the theme name from a cookie
#[derive(Debug, Clone)]
pub struct CookieThemeResolver {
    cookie_name: String,
}

impl CookieThemeResolver {
    /// Create a resolver reading the given cookie
    #[must_use]
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }
}

impl ThemeResolver for CookieThemeResolver {
    fn resolve_theme(&self, parts: &Parts) -> Option<String> {
        CookieJar::from_headers(&parts.headers)
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Reads a [`Theme`] placed in the request extensions by an earlier layer
///
/// Authentication middleware that derives the theme from user claims inserts
/// the `Theme` into the request extensions; this resolver picks it up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionThemeResolver;

impl ThemeResolver for ExtensionThemeResolver {
    fn resolve_theme(&self, parts: &Parts) -> Option<String> {
        parts
            .extensions
            .get::<Theme>()
            .map(|theme| theme.as_str().to_string())
    }
}

/// Tries several resolvers in order and returns the first valid theme name
///
/// A name that fails [`is_valid_theme_name`] is skipped, so a malformed cookie
/// does not hide the resolvers after it.
#[derive(Clone, Default)]
pub struct ChainThemeResolver {
    resolvers: Vec<Arc<dyn ThemeResolver>>,
}

impl ChainThemeResolver {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver to the chain
    #[must_use]
    pub fn with(mut self, resolver: impl ThemeResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }
}

impl ThemeResolver for ChainThemeResolver {
    fn resolve_theme(&self, parts: &Parts) -> Option<String> {
        self.resolvers
            .iter()
            .find_map(|resolver| {
                resolver
                    .resolve_theme(parts)
                    .filter(|name| is_valid_theme_name(name))
            })
    }
}
