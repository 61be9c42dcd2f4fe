//! Themes
//!
//! A theme names one look-and-feel of the application. Theme names end up in
//! file-system paths (`themes/<name>/...`) and cache keys, so they are
//! validated once, when a [`Theme`] is constructed, and are immutable after.
//!
//! # Examples
//!
//! ```rust
//! use chame::theme::{is_valid_theme_name, Theme};
//!
//! assert!(is_valid_theme_name("Blue"));
//! assert!(!is_valid_theme_name(".."));
//!
//! let theme = Theme::new("Blue").unwrap();
//! assert_eq!(theme.as_str(), "Blue");
//! ```

pub mod resolver;

pub use resolver::{
    ChainThemeResolver, CookieThemeResolver, ExtensionThemeResolver, ThemeResolver,
};

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Characters that are reserved on at least one supported file system
const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Errors raised when constructing a [`Theme`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    /// Theme name is empty, `.`, `..` or contains a reserved character
    #[error("invalid theme name: {0:?}")]
    InvalidName(String),
}

/// Returns `true` if `name` can be used as a theme name
///
/// Rejects the empty string, `.` and `..`, and any name containing a
/// file-system reserved character or an ASCII control character.
#[must_use]
pub fn is_valid_theme_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    !name
        .chars()
        .any(|c| c.is_ascii_control() || RESERVED_CHARS.contains(&c))
}

/// A validated theme name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Theme(String);

impl Theme {
    /// Create a theme after validating its name
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::InvalidName`] if [`is_valid_theme_name`] rejects the name.
    pub fn new(name: impl Into<String>) -> Result<Self, ThemeError> {
        let name = name.into();
        if is_valid_theme_name(&name) {
            Ok(Self(name))
        } else {
            Err(ThemeError::InvalidName(name))
        }
    }

    /// The theme name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Theme {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
