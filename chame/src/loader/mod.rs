//! Content loaders
//!
//! A loader turns a [`RequestContext`] into a [`ResponseOutcome`]. The
//! middleware invokes every loader taking part in a request in priority order
//! and merges what they return.
//!
//! Two loaders ship with the crate:
//!
//! - [`FileContentLoader`] concatenates the files listed in the content schema
//! - [`CallbackLoader`] wraps an application closure
//!
//! Applications add their own by implementing [`ContentLoader`] and
//! registering it in the [`LoaderRegistry`].

pub mod callback;
pub mod file;
pub mod registry;

pub use callback::{CallbackLoader, LoaderCallback};
pub use file::{fingerprint, select_entries, FileContentLoader};
pub use registry::LoaderRegistry;

use async_trait::async_trait;

use crate::content::{ContentCategory, ResponseOutcome};
use crate::context::RequestContext;
use crate::error::ChameResult;

/// Produces bundle content for a request
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use chame::content::{Charset, ContentCategory, ResponseOutcome};
/// use chame::context::RequestContext;
/// use chame::error::ChameResult;
/// use chame::loader::ContentLoader;
///
/// struct Banner;
///
/// #[async_trait]
/// impl ContentLoader for Banner {
///     fn name(&self) -> &str {
///         "banner"
///     }
///
///     fn priority(&self) -> i32 {
///         -10
///     }
///
///     fn supports(&self, category: ContentCategory) -> bool {
///         category == ContentCategory::JavaScript
///     }
///
///     async fn load(&self, ctx: &RequestContext) -> ChameResult<ResponseOutcome> {
///         let line = format!("/* theme: {} */", ctx.theme());
///         Ok(ResponseOutcome::content(line, Charset::utf8(), None))
///     }
/// }
/// ```
#[async_trait]
pub trait ContentLoader: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Invocation order; lower runs first
    fn priority(&self) -> i32 {
        0
    }

    /// Whether this loader serves the category
    fn supports(&self, _category: ContentCategory) -> bool {
        true
    }

    /// Load content for the request
    ///
    /// # Errors
    ///
    /// Any error is fatal for the request.
    async fn load(&self, ctx: &RequestContext) -> ChameResult<ResponseOutcome>;
}
