//! chame: themed JavaScript and CSS bundling for axum applications
//!
//! chame intercepts `GET` requests for a configured JavaScript and CSS path,
//! works out the request's theme, concatenates the files the content schema
//! lists for that theme and answers with a single bundle, with ETag and
//! `304 Not Modified` support.
//!
//! # Pipeline
//!
//! 1. [`middleware::BundleLayer`] recognizes the request and resolves the theme
//!    (request extension, cookie, custom resolver or configured default)
//! 2. a [`context::RequestContext`] is built with the filter, the client ETag
//!    and the loaders taking part
//! 3. every [`loader::ContentLoader`] runs in priority order; the built-in
//!    [`loader::FileContentLoader`] resolves the file list through the
//!    [`schema::SchemaResolver`] and reads files through a
//!    [`storage::FileProvider`]
//! 4. the outcomes are merged and written as the response
//!
//! File lists and bundles are kept in the [`cache`] for a fixed TTL.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chame::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     chame::observability::init()?;
//!
//!     let config = ChameConfig::load_from("chame.toml")?;
//!     let state = ChameState::from_config(config, "./wwwroot")?;
//!
//!     let app = axum::Router::new()
//!         .route("/", axum::routing::get(index))
//!         .layer(BundleLayer::new(state));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//!
//! async fn index() -> &'static str {
//!     "Hello!"
//! }
//! ```
//!
//! With a `wwwroot/chame.json` such as:
//!
//! ```json
//! {
//!   "cssFiles": [ { "path": "/css/site.css" } ],
//!   "themes": [ { "name": "Blue", "cssFiles": [ { "path": "/themes/Blue/blue.css" } ] } ]
//! }
//! ```
//!
//! a request for `/chame/css` carrying the cookie `theme=Blue` returns
//! `site.css` followed by `blue.css`.

pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod handlers;
pub mod loader;
pub mod middleware;
pub mod observability;
pub mod schema;
pub mod state;
pub mod storage;
pub mod template;
pub mod theme;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use chame::prelude::*;
    //! ```

    // Configuration
    pub use crate::config::{ChameConfig, Environment};

    // Application state and middleware
    pub use crate::middleware::BundleLayer;
    pub use crate::state::{ChameState, ChameStateBuilder};

    // Themes
    pub use crate::theme::{
        ChainThemeResolver, CookieThemeResolver, ExtensionThemeResolver, Theme, ThemeResolver,
    };

    // Content and loaders
    pub use crate::content::{Charset, ContentCategory, ResponseOutcome};
    pub use crate::context::{LoadRequest, RequestContext};
    pub use crate::loader::{CallbackLoader, ContentLoader, FileContentLoader};

    // Schema
    pub use crate::schema::{CallbackSchemaProvider, ContentSchema, FileEntry, SchemaProvider};

    // Storage
    pub use crate::storage::{FileProvider, InMemoryFileProvider, LocalFileProvider, StorageError};

    // Cache
    pub use crate::cache::{Cache, CacheMode, MemoryCache};

    // Error types
    pub use crate::error::{ChameError, ChameResult};

    // Re-export key dependencies
    pub use async_trait::async_trait;
    pub use axum;
}
