//! Core types for file providers

use thiserror::Error;

/// Errors that can occur while reading bundle sources
#[derive(Debug, Error)]
pub enum StorageError {
    /// File not found in the provider
    #[error("File not found: {0}")]
    NotFound(String),

    /// I/O error while reading a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path escapes the content root or is otherwise unusable
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Generic provider error
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Normalizes a schema path into a provider-relative key
///
/// Schema files conventionally use web-root paths (`/css/site.css`) or
/// application-relative paths (`~/css/site.css`); both map to `css/site.css`.
/// Backslashes are treated as separators.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] for empty paths and for paths with a
/// `..` segment.
pub fn normalize_path(path: &str) -> StorageResult<String> {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("~/").unwrap_or(trimmed);
    let segments: Vec<&str> = trimmed
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    if segments.iter().any(|segment| *segment == ".." || segment.contains(':')) {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_web_paths() {
        assert_eq!(normalize_path("/css/site.css").unwrap(), "css/site.css");
        assert_eq!(normalize_path("~/css/site.css").unwrap(), "css/site.css");
        assert_eq!(normalize_path("css//./site.css").unwrap(), "css/site.css");
        assert_eq!(normalize_path("js\\app.js").unwrap(), "js/app.js");
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        assert!(matches!(
            normalize_path("../secret.txt"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            normalize_path("css/../../secret.txt"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(normalize_path("C:/windows"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(normalize_path("/"), Err(StorageError::InvalidPath(_))));
    }
}
