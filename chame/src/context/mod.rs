//! Per-request bundle context
//!
//! A [`RequestContext`] is built once for every recognized bundle request and
//! is read-only afterwards. It carries everything loaders need: the category,
//! the compiled filter, the resolved theme, the client's ETag and the ordered
//! loaders taking part in the request.

use http::header::IF_NONE_MATCH;
use http::request::Parts;
use http::HeaderMap;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::content::ContentCategory;
use crate::error::{ChameError, ChameResult};
use crate::loader::ContentLoader;
use crate::theme::Theme;

/// Request filter compiled once per request
///
/// The filter string is a regular expression searched for in each file's
/// filter tag. A filter that is not a valid expression is matched literally.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    pattern: String,
    regex: Regex,
}

impl RequestFilter {
    /// Compile a filter
    ///
    /// # Errors
    ///
    /// Returns an error only if neither the pattern nor its escaped form can be
    /// compiled (e.g. it exceeds the regex size limit).
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::debug!(pattern = %pattern, error = %e, "filter is not a regex; matching literally");
                Regex::new(&regex::escape(&pattern))?
            }
        };
        Ok(Self { pattern, regex })
    }

    /// The filter as sent by the client
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a file's filter tag is selected by this filter
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }
}

/// Whether an `If-None-Match` header value matches a fingerprint
///
/// Handles lists, weak validators (`W/"..."`) and the `*` wildcard.
#[must_use]
pub fn if_none_match_matches(header: &str, fingerprint: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == fingerprint
    })
}

/// Owned snapshot of a request, handed to callback loaders
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Requested category
    pub category: ContentCategory,
    /// Resolved theme
    pub theme: Theme,
    /// Filter string, if any
    pub filter: Option<String>,
    /// Client ETag, when it is honoured
    pub client_etag: Option<String>,
    /// Request headers
    pub headers: HeaderMap,
}

/// Everything known about one bundle request
pub struct RequestContext {
    request: Parts,
    category: ContentCategory,
    filter: Option<RequestFilter>,
    client_etag: Option<String>,
    theme: Theme,
    loaders: Vec<Arc<dyn ContentLoader>>,
}

impl RequestContext {
    /// Build the context
    ///
    /// The client's `If-None-Match` header is kept only when ETag support is
    /// on and exactly one loader takes part: with several independent loaders
    /// one fingerprint cannot describe the merged response.
    ///
    /// # Errors
    ///
    /// Returns [`ChameError::Config`] if `loaders` is empty.
    pub fn new(
        request: Parts,
        category: ContentCategory,
        filter: Option<RequestFilter>,
        theme: Theme,
        loaders: Vec<Arc<dyn ContentLoader>>,
        etag_enabled: bool,
    ) -> ChameResult<Self> {
        if loaders.is_empty() {
            return Err(ChameError::Config(format!(
                "no content loader registered for {category}"
            )));
        }

        let client_etag = if etag_enabled && loaders.len() == 1 {
            request
                .headers
                .get(IF_NONE_MATCH)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        } else {
            None
        };

        Ok(Self {
            request,
            category,
            filter,
            client_etag,
            theme,
            loaders,
        })
    }

    /// The inbound request (without body)
    #[must_use]
    pub const fn request(&self) -> &Parts {
        &self.request
    }

    /// Requested category
    #[must_use]
    pub const fn category(&self) -> ContentCategory {
        self.category
    }

    /// Compiled request filter
    #[must_use]
    pub const fn filter(&self) -> Option<&RequestFilter> {
        self.filter.as_ref()
    }

    /// Request filter string
    #[must_use]
    pub fn filter_pattern(&self) -> Option<&str> {
        self.filter.as_ref().map(RequestFilter::pattern)
    }

    /// Honoured `If-None-Match` value
    #[must_use]
    pub fn client_etag(&self) -> Option<&str> {
        self.client_etag.as_deref()
    }

    /// Whether the client's cached copy has this fingerprint
    #[must_use]
    pub fn client_etag_matches(&self, fingerprint: &str) -> bool {
        self.client_etag
            .as_deref()
            .is_some_and(|header| if_none_match_matches(header, fingerprint))
    }

    /// Resolved theme
    #[must_use]
    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Loaders in invocation order
    #[must_use]
    pub fn loaders(&self) -> &[Arc<dyn ContentLoader>] {
        &self.loaders
    }

    /// Owned snapshot for callback loaders
    #[must_use]
    pub fn to_load_request(&self) -> LoadRequest {
        LoadRequest {
            category: self.category,
            theme: self.theme.clone(),
            filter: self.filter_pattern().map(str::to_string),
            client_etag: self.client_etag.clone(),
            headers: self.request.headers.clone(),
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("path", &self.request.uri.path())
            .field("category", &self.category)
            .field("filter", &self.filter_pattern())
            .field("client_etag", &self.client_etag)
            .field("theme", &self.theme)
            .field(
                "loaders",
                &self.loaders.iter().map(|l| l.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ResponseOutcome;
    use crate::loader::CallbackLoader;
    use http::Request;

    fn parts_with_etag(etag: &str) -> Parts {
        Request::builder()
            .uri("/chame/css")
            .header(IF_NONE_MATCH, etag)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn loader(name: &'static str) -> Arc<dyn ContentLoader> {
        Arc::new(CallbackLoader::from_fn(name, |_request: LoadRequest| async {
            Ok(ResponseOutcome::NotFound)
        }))
    }

    #[test]
    fn test_filter_regex_search() {
        let filter = RequestFilter::new("mob").unwrap();
        assert!(filter.matches("mobile"));
        assert!(!filter.matches("desktop"));

        let anchored = RequestFilter::new("^admin$").unwrap();
        assert!(anchored.matches("admin"));
        assert!(!anchored.matches("superadmin"));
    }

    #[test]
    fn test_invalid_filter_matches_literally() {
        let filter = RequestFilter::new("a(b").unwrap();
        assert!(filter.matches("xa(by"));
        assert!(!filter.matches("ab"));
        assert_eq!(filter.pattern(), "a(b");
    }

    #[test]
    fn test_if_none_match_parsing() {
        assert!(if_none_match_matches("\"ABC\"", "ABC"));
        assert!(if_none_match_matches("W/\"ABC\"", "ABC"));
        assert!(if_none_match_matches("\"X\", \"ABC\"", "ABC"));
        assert!(if_none_match_matches("ABC", "ABC"));
        assert!(if_none_match_matches("*", "ABC"));
        assert!(!if_none_match_matches("\"ABD\"", "ABC"));
    }

    #[test]
    fn test_client_etag_kept_for_single_loader() {
        let ctx = RequestContext::new(
            parts_with_etag("\"F00\""),
            ContentCategory::Css,
            None,
            Theme::new("Blue").unwrap(),
            vec![loader("one")],
            true,
        )
        .unwrap();
        assert_eq!(ctx.client_etag(), Some("\"F00\""));
        assert!(ctx.client_etag_matches("F00"));
    }

    #[test]
    fn test_client_etag_dropped_for_multiple_loaders() {
        let ctx = RequestContext::new(
            parts_with_etag("\"F00\""),
            ContentCategory::Css,
            None,
            Theme::new("Blue").unwrap(),
            vec![loader("one"), loader("two")],
            true,
        )
        .unwrap();
        assert_eq!(ctx.client_etag(), None);
        assert!(!ctx.client_etag_matches("F00"));
    }

    #[test]
    fn test_client_etag_dropped_when_etag_disabled() {
        let ctx = RequestContext::new(
            parts_with_etag("\"F00\""),
            ContentCategory::Css,
            None,
            Theme::new("Blue").unwrap(),
            vec![loader("one")],
            false,
        )
        .unwrap();
        assert_eq!(ctx.client_etag(), None);
    }

    #[test]
    fn test_empty_loader_list_rejected() {
        let result = RequestContext::new(
            parts_with_etag("\"F00\""),
            ContentCategory::Css,
            None,
            Theme::new("Blue").unwrap(),
            Vec::new(),
            true,
        );
        assert!(matches!(result, Err(ChameError::Config(_))));
    }
}
