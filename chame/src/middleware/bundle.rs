//! Bundle middleware
//!
//! Intercepts `GET` requests for the configured JavaScript and CSS paths and
//! answers them with the themed bundle. Every other request, and every bundle
//! request for which no theme can be determined, passes through unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use chame::{config::ChameConfig, middleware::BundleLayer, state::ChameState};
//!
//! # fn example() -> anyhow::Result<()> {
//! let state = ChameState::from_config(ChameConfig::default(), "./wwwroot")?;
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "home" }))
//!     .layer(BundleLayer::new(state));
//! # Ok(())
//! # }
//! ```

use axum::{
    body::Body,
    extract::{Query, Request},
    response::Response,
};
use http::request::Parts;
use http::{Method, Uri};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::content::{ContentCategory, ResponseOutcome};
use crate::context::{RequestContext, RequestFilter};
use crate::handlers::bundle::{respond, serve_bundle};
use crate::state::ChameState;
use crate::theme::Theme;

/// A request addressed to one of the bundle paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRoute {
    /// Requested category
    pub category: ContentCategory,
    /// Filter from the query string or the extra path segment
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilterQuery {
    filter: Option<String>,
}

/// Match a request against the configured bundle paths
///
/// Matches `GET` requests whose path is a bundle path, or a bundle path plus
/// one segment. The `filter` query parameter wins over that segment. Both are
/// percent-decoded, so `/css/a%20b` and `/css?filter=a%20b` are the same
/// filter.
#[must_use]
pub fn recognize(state: &ChameState, method: &Method, uri: &Uri) -> Option<BundleRoute> {
    if *method != Method::GET {
        return None;
    }

    let bundle = &state.config().bundle;
    let path = uri.path();
    let (category, segment) = [
        (ContentCategory::JavaScript, bundle.js_path.as_str()),
        (ContentCategory::Css, bundle.css_path.as_str()),
    ]
    .into_iter()
    .find_map(|(category, base)| match_path(path, base).map(|segment| (category, segment)))?;

    let query_filter = Query::<FilterQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.filter);
    let filter = query_filter
        .or_else(|| {
            segment.map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        })
        .filter(|filter| !filter.is_empty());

    Some(BundleRoute { category, filter })
}

/// `Some(None)` for an exact match, `Some(Some(segment))` for one extra segment
fn match_path<'a>(path: &'a str, base: &str) -> Option<Option<&'a str>> {
    let base = base.trim_end_matches('/');
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest == "/" {
        return Some(None);
    }
    let segment = rest.strip_prefix('/')?;
    let segment = segment.strip_suffix('/').unwrap_or(segment);
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    Some(Some(segment))
}

/// Resolved theme for the request, or the configured default
///
/// Names rejected by validation are ignored.
#[must_use]
pub fn resolve_theme(state: &ChameState, parts: &Parts) -> Option<Theme> {
    state
        .theme_resolver()
        .resolve_theme(parts)
        .and_then(|name| {
            Theme::new(name)
                .inspect_err(|e| tracing::debug!(error = %e, "ignoring requested theme"))
                .ok()
        })
        .or_else(|| state.default_theme().cloned())
}

/// Layer installing the bundle middleware
#[derive(Clone, Debug)]
pub struct BundleLayer {
    state: ChameState,
}

impl BundleLayer {
    /// Create the layer
    #[must_use]
    pub const fn new(state: ChameState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for BundleLayer {
    type Service = BundleMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BundleMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Middleware answering bundle requests
#[derive(Clone, Debug)]
pub struct BundleMiddleware<S> {
    inner: S,
    state: ChameState,
}

impl<S> Service<Request> for BundleMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let state = self.state.clone();
        let mut inner = self.inner.clone();

        let Some(route) = recognize(&state, req.method(), req.uri()) else {
            return Box::pin(inner.call(req));
        };

        let (parts, body) = req.into_parts();
        let Some(theme) = resolve_theme(&state, &parts) else {
            tracing::debug!(path = %parts.uri.path(), "no theme for bundle request; passing through");
            return Box::pin(inner.call(Request::from_parts(parts, body)));
        };

        let loaders = state.loaders_for(route.category);
        let filter = route.filter.and_then(|pattern| {
            RequestFilter::new(pattern)
                .inspect_err(|e| tracing::warn!(error = %e, "unusable request filter; ignoring"))
                .ok()
        });

        let etag_enabled = state.config().bundle.etag_enabled;
        let ctx = match RequestContext::new(parts, route.category, filter, theme, loaders, etag_enabled) {
            Ok(ctx) => ctx,
            Err(e) => {
                // Misconfiguration is served as "no content"
                tracing::error!(category = %route.category, error = %e, "cannot build bundle request context");
                let response = respond(route.category, ResponseOutcome::NotFound, false, &state.config().bundle);
                return Box::pin(async move { Ok(response) });
            }
        };

        tracing::debug!(
            category = %ctx.category(),
            theme = %ctx.theme(),
            filter = ?ctx.filter_pattern(),
            loaders = ctx.loaders().len(),
            "serving bundle"
        );
        Box::pin(async move { Ok(serve_bundle(&state, ctx).await) })
    }
}
