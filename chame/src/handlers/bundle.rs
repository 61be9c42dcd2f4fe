//! Bundle request handling: dispatch, fallback, merge and respond

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG};
use http::{HeaderValue, StatusCode};
use tracing::{debug, error, warn};

use crate::config::BundleSettings;
use crate::content::{Charset, ContentCategory, ResponseOutcome};
use crate::context::RequestContext;
use crate::error::{ChameError, ChameResult};
use crate::state::ChameState;

/// Serve a recognized bundle request
///
/// Errors are logged here, once, and rendered as `500 Internal Server Error`.
pub async fn serve_bundle(state: &ChameState, ctx: RequestContext) -> Response {
    bundle_response(state, &ctx).await.unwrap_or_else(|e| {
        error!(
            path = %ctx.request().uri.path(),
            category = %ctx.category(),
            theme = %ctx.theme(),
            error = %e,
            "bundle request failed"
        );
        e.into_response()
    })
}

async fn bundle_response(state: &ChameState, ctx: &RequestContext) -> ChameResult<Response> {
    let etag_enabled = state.config().bundle.etag_enabled;

    let mut responses = dispatch(ctx, etag_enabled).await?;
    if responses.is_empty() {
        if let Some(payload) = state.content_not_found(ctx.to_load_request()).await {
            debug!(category = %ctx.category(), theme = %ctx.theme(), "serving not-found fallback content");
            responses.push(ResponseOutcome::content(payload, state.charset().clone(), None));
        }
    }

    let single = responses.len() == 1;
    let outcome = merge(responses)?;
    Ok(respond(ctx.category(), outcome, single, &state.config().bundle))
}

/// Invoke every loader in order and keep the usable outcomes
///
/// `NotFound` outcomes are skipped and `Ok` outcomes without a payload are
/// dropped. `NotModified` is kept only for a single loader with ETag support
/// on and a client ETag present; anywhere else it is dropped with a warning.
///
/// # Errors
///
/// The first loader error aborts the request.
pub async fn dispatch(ctx: &RequestContext, etag_enabled: bool) -> ChameResult<Vec<ResponseOutcome>> {
    let not_modified_allowed =
        etag_enabled && ctx.loaders().len() == 1 && ctx.client_etag().is_some();
    let mut responses = Vec::with_capacity(ctx.loaders().len());

    for loader in ctx.loaders() {
        let outcome = loader.load(ctx).await.inspect_err(|_| {
            debug!(loader = loader.name(), "content loader failed");
        })?;

        match outcome {
            ResponseOutcome::NotFound => {
                debug!(loader = loader.name(), "loader has no content");
            }
            ResponseOutcome::Ok { payload: None, .. } => {
                warn!(loader = loader.name(), "loader returned no payload; dropping");
            }
            ResponseOutcome::NotModified { .. } if !not_modified_allowed => {
                warn!(loader = loader.name(), "unexpected not-modified outcome; dropping");
            }
            outcome => responses.push(outcome),
        }
    }

    Ok(responses)
}

/// Combine loader outcomes into one
///
/// No outcome gives `NotFound` and a single outcome is used verbatim. Several
/// outcomes are concatenated in order; the merged result has no fingerprint.
///
/// # Errors
///
/// Returns [`ChameError::Consistency`] when a `NotModified` outcome would be
/// merged with anything else, or when the charsets differ.
pub fn merge(responses: Vec<ResponseOutcome>) -> ChameResult<ResponseOutcome> {
    if responses.len() <= 1 {
        return Ok(responses.into_iter().next().unwrap_or(ResponseOutcome::NotFound));
    }

    let mut merged = BytesMut::new();
    let mut merged_charset: Option<Charset> = None;
    for response in responses {
        match response {
            ResponseOutcome::Ok {
                payload, charset, ..
            } => {
                match &merged_charset {
                    Some(existing) if *existing != charset => {
                        return Err(ChameError::Consistency(format!(
                            "cannot merge {charset} content into {existing} content"
                        )));
                    }
                    Some(_) => {}
                    None => merged_charset = Some(charset),
                }
                if let Some(payload) = payload {
                    merged.extend_from_slice(&payload);
                }
            }
            ResponseOutcome::NotModified { .. } => {
                return Err(ChameError::Consistency(
                    "cannot merge a not-modified outcome with other content".to_string(),
                ));
            }
            ResponseOutcome::NotFound => {}
        }
    }

    Ok(ResponseOutcome::Ok {
        payload: Some(merged.freeze()),
        charset: merged_charset.unwrap_or_default(),
        fingerprint: None,
    })
}

/// Render an outcome as an HTTP response
///
/// `single` tells whether exactly one outcome contributed; the `ETag` header is
/// written only then.
#[must_use]
pub fn respond(
    category: ContentCategory,
    outcome: ResponseOutcome,
    single: bool,
    settings: &BundleSettings,
) -> Response {
    let (status, payload, charset, fingerprint) = match outcome {
        ResponseOutcome::Ok {
            payload,
            charset,
            fingerprint,
        } => (StatusCode::OK, payload.unwrap_or_default(), charset, fingerprint),
        ResponseOutcome::NotModified { fingerprint } => (
            StatusCode::NOT_MODIFIED,
            Bytes::new(),
            Charset::new(settings.charset.clone()),
            Some(fingerprint),
        ),
        ResponseOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Bytes::new(),
            Charset::new(settings.charset.clone()),
            None,
        ),
    };

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    let mime_type = category.descriptor().mime_type;
    let content_type = HeaderValue::from_str(&format!("{mime_type}; charset={charset}"))
        .unwrap_or_else(|_| {
            warn!(charset = %charset, "charset is not a valid header value; sending bare content type");
            HeaderValue::from_static(mime_type)
        });
    headers.insert(CONTENT_TYPE, content_type);

    if single && settings.etag_enabled {
        if let Some(value) = fingerprint.and_then(|fp| HeaderValue::from_str(&format!("\"{fp}\"")).ok()) {
            headers.insert(ETAG, value);
        }
    }

    if status != StatusCode::NOT_FOUND {
        if let Some(value) = settings
            .cache_control
            .as_deref()
            .and_then(|cc| HeaderValue::from_str(cc).ok())
        {
            headers.insert(CACHE_CONTROL, value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LoadRequest;
    use crate::loader::{CallbackLoader, ContentLoader};
    use crate::theme::Theme;
    use http::header::IF_NONE_MATCH;
    use http::Request;
    use std::sync::Arc;

    fn ok(text: &str, charset: &str) -> ResponseOutcome {
        ResponseOutcome::content(text.to_string(), Charset::new(charset), Some("FP".to_string()))
    }

    fn returning(name: &str, outcome: ResponseOutcome) -> Arc<dyn ContentLoader> {
        Arc::new(CallbackLoader::from_fn(name, move |_request: LoadRequest| {
            let outcome = outcome.clone();
            async move { Ok(outcome) }
        }))
    }

    fn context(loaders: Vec<Arc<dyn ContentLoader>>, etag: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri("/chame/js");
        if let Some(etag) = etag {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        RequestContext::new(
            parts,
            ContentCategory::JavaScript,
            None,
            Theme::new("Blue").unwrap(),
            loaders,
            true,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_skips_not_found_and_empty_payloads() {
        let ctx = context(
            vec![
                returning("missing", ResponseOutcome::NotFound),
                returning(
                    "empty",
                    ResponseOutcome::Ok {
                        payload: None,
                        charset: Charset::utf8(),
                        fingerprint: None,
                    },
                ),
                returning("real", ok("a()", "utf-8")),
            ],
            None,
        );

        let responses = dispatch(&ctx, true).await.unwrap();
        assert_eq!(responses, vec![ok("a()", "utf-8")]);
    }

    #[tokio::test]
    async fn test_dispatch_drops_not_modified_with_several_loaders() {
        let not_modified = ResponseOutcome::NotModified {
            fingerprint: "FP".to_string(),
        };
        let ctx = context(
            vec![returning("one", not_modified.clone()), returning("two", ok("b()", "utf-8"))],
            Some("\"FP\""),
        );

        let responses = dispatch(&ctx, true).await.unwrap();
        assert_eq!(responses, vec![ok("b()", "utf-8")]);
    }

    #[tokio::test]
    async fn test_dispatch_keeps_not_modified_for_single_loader() {
        let not_modified = ResponseOutcome::NotModified {
            fingerprint: "FP".to_string(),
        };
        let ctx = context(vec![returning("one", not_modified.clone())], Some("\"FP\""));

        assert_eq!(dispatch(&ctx, true).await.unwrap(), vec![not_modified.clone()]);
        assert!(dispatch(&ctx, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_propagates_loader_error() {
        let failing: Arc<dyn ContentLoader> =
            Arc::new(CallbackLoader::from_fn("failing", |_request: LoadRequest| async {
                Err(ChameError::Loader {
                    loader: "failing".to_string(),
                    message: "backend down".to_string(),
                })
            }));
        let ctx = context(vec![failing, returning("real", ok("a()", "utf-8"))], None);

        assert!(matches!(
            dispatch(&ctx, true).await,
            Err(ChameError::Loader { .. })
        ));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_loader_failure_logged_once() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let failing: Arc<dyn ContentLoader> =
            Arc::new(CallbackLoader::from_fn("failing", |_request: LoadRequest| async {
                Err(ChameError::Loader {
                    loader: "failing".to_string(),
                    message: "backend down".to_string(),
                })
            }));
        let state = ChameState::builder(crate::config::ChameConfig::default())
            .storage(Arc::new(crate::storage::InMemoryFileProvider::new()))
            .build()
            .unwrap();

        let response = serve_bundle(&state, context(vec![failing], None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert_eq!(output.matches("ERROR").count(), 1, "{output}");
        assert!(output.contains("backend down"));
    }

    #[test]
    fn test_merge_concatenates_in_order() {
        let merged = merge(vec![ok("a();", "utf-8"), ok("b();", "UTF-8")]).unwrap();
        assert_eq!(
            merged,
            ResponseOutcome::Ok {
                payload: Some(Bytes::from_static(b"a();b();")),
                charset: Charset::utf8(),
                fingerprint: None,
            }
        );
    }

    #[test]
    fn test_merge_single_is_verbatim() {
        assert_eq!(merge(vec![ok("a();", "utf-8")]).unwrap(), ok("a();", "utf-8"));
        assert_eq!(merge(Vec::new()).unwrap(), ResponseOutcome::NotFound);
    }

    #[test]
    fn test_merge_rejects_mixed_charsets() {
        let err = merge(vec![ok("a", "utf-8"), ok("b", "iso-8859-1")]).unwrap_err();
        assert!(matches!(err, ChameError::Consistency(_)));
    }

    #[test]
    fn test_merge_rejects_not_modified_with_content() {
        let err = merge(vec![
            ResponseOutcome::NotModified {
                fingerprint: "FP".to_string(),
            },
            ok("b", "utf-8"),
        ])
        .unwrap_err();
        assert!(matches!(err, ChameError::Consistency(_)));
    }

    #[test]
    fn test_respond_headers() {
        let settings = BundleSettings {
            cache_control: Some("public, max-age=60".to_string()),
            ..BundleSettings::default()
        };

        let response = respond(ContentCategory::Css, ok("a{}", "utf-8"), true, &settings);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(response.headers()[ETAG], "\"FP\"");
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=60");

        let merged = respond(ContentCategory::Css, ok("a{}", "utf-8"), false, &settings);
        assert!(merged.headers().get(ETAG).is_none());
    }

    #[test]
    fn test_respond_status_codes() {
        let settings = BundleSettings::default();

        let not_modified = respond(
            ContentCategory::JavaScript,
            ResponseOutcome::NotModified {
                fingerprint: "FP".to_string(),
            },
            true,
            &settings,
        );
        assert_eq!(not_modified.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(not_modified.headers()[ETAG], "\"FP\"");

        let not_found = respond(ContentCategory::JavaScript, ResponseOutcome::NotFound, false, &settings);
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            not_found.headers()[CONTENT_TYPE],
            "application/javascript; charset=utf-8"
        );
    }

    #[test]
    fn test_respond_without_etag_support() {
        let settings = BundleSettings {
            etag_enabled: false,
            ..BundleSettings::default()
        };
        let response = respond(ContentCategory::Css, ok("a{}", "utf-8"), true, &settings);
        assert!(response.headers().get(ETAG).is_none());
    }
}
