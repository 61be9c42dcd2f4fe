//! Request handlers

pub mod bundle;

pub use bundle::{dispatch, merge, respond, serve_bundle};
