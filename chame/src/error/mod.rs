//! Error types and error handling
//!
//! Recoverable conditions (a declared file that does not exist, a theme that is
//! missing from the schema) never reach this type: they are logged and turned
//! into empty results. Everything that does reach [`ChameError`] is fatal for the
//! current request and is rendered as a `500 Internal Server Error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::schema::SchemaError;
use crate::storage::StorageError;
use crate::theme::ThemeError;

/// Crate-level error type
#[derive(Debug, Error)]
pub enum ChameError {
    /// Configuration error (missing path, unreadable config file, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// File provider error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Content schema could not be parsed or validated
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invalid theme name
    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),

    /// Loader outcomes that cannot be combined into one response
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// A content loader failed
    #[error("Loader '{loader}' failed: {message}")]
    Loader {
        /// Name of the failing loader
        loader: String,
        /// Failure description
        message: String,
    },
}

/// Result alias used throughout the crate
pub type ChameResult<T> = Result<T, ChameError>;

/// The detail is not exposed to the client; callers log it with the request
/// context before rendering.
impl IntoResponse for ChameError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_renders_as_500() {
        let response = ChameError::Consistency("mixed charsets".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_loader_error_message() {
        let err = ChameError::Loader {
            loader: "files".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Loader 'files' failed: boom");
    }
}
