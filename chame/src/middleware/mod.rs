//! Middleware layers for chame
//!
//! Provides the bundle middleware, which answers JavaScript and CSS bundle
//! requests and lets everything else through.

pub mod bundle;

pub use bundle::{recognize, resolve_theme, BundleLayer, BundleMiddleware, BundleRoute};
