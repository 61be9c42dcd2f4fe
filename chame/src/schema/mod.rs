//! Content schema: which files make up each bundle
//!
//! The schema is a JSON document listing common files per category and, per
//! theme, additional files:
//!
//! ```json
//! {
//!   "cssFiles": [ { "path": "/css/site.css" }, { "path": "/css/mobile.css", "filter": "mobile" } ],
//!   "jsFiles":  [ { "path": "/js/app.js" } ],
//!   "themes": [
//!     { "name": "Blue",
//!       "cssFiles": [ { "path": "/themes/Blue/blue.css" } ],
//!       "jsFiles":  [] }
//!   ]
//! }
//! ```
//!
//! A bundle for theme `T` consists of the category's common files followed by
//! `T`'s own files, in declaration order.

pub mod provider;
pub mod resolver;

pub use provider::{
    CallbackSchemaProvider, FileSchemaProvider, SchemaCallback, SchemaProvider, SchemaRequest,
};
pub use resolver::SchemaResolver;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::content::ContentCategory;

/// Errors raised while parsing a content schema
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document is not valid schema JSON
    #[error("malformed schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two theme entries share a name
    #[error("duplicate theme in schema: {0}")]
    DuplicateTheme(String),
}

/// One file contributing to a bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path of the file, relative to the content root
    pub path: String,

    /// Optional tag selecting this file for filtered requests
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl FileEntry {
    /// An untagged entry
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filter: None,
        }
    }

    /// A tagged entry
    #[must_use]
    pub fn tagged(path: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filter: Some(filter.into()),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Files specific to one theme
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeFileSet {
    /// Theme name, matched exactly
    pub name: String,

    /// Theme JavaScript files
    #[serde(default)]
    pub js_files: Vec<FileEntry>,

    /// Theme stylesheet files
    #[serde(default)]
    pub css_files: Vec<FileEntry>,
}

impl ThemeFileSet {
    /// Files of the given category
    #[must_use]
    pub fn files(&self, category: ContentCategory) -> &[FileEntry] {
        match category {
            ContentCategory::JavaScript => &self.js_files,
            ContentCategory::Css => &self.css_files,
        }
    }
}

/// The whole schema document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSchema {
    /// JavaScript files shared by every theme
    #[serde(default)]
    pub js_files: Vec<FileEntry>,

    /// Stylesheet files shared by every theme
    #[serde(default)]
    pub css_files: Vec<FileEntry>,

    /// Per-theme file sets
    #[serde(default)]
    pub themes: Vec<ThemeFileSet>,
}

impl ContentSchema {
    /// Parse and validate a schema document
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] for malformed JSON and
    /// [`SchemaError::DuplicateTheme`] when a theme name appears twice.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_slice(bytes)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check that theme names are unique
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateTheme`] naming the first repeated theme.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for theme in &self.themes {
            if !seen.insert(theme.name.as_str()) {
                return Err(SchemaError::DuplicateTheme(theme.name.clone()));
            }
        }
        Ok(())
    }

    /// Common files of the given category
    #[must_use]
    pub fn common_files(&self, category: ContentCategory) -> &[FileEntry] {
        match category {
            ContentCategory::JavaScript => &self.js_files,
            ContentCategory::Css => &self.css_files,
        }
    }

    /// The file set of a theme, by exact name
    #[must_use]
    pub fn theme(&self, name: &str) -> Option<&ThemeFileSet> {
        self.themes.iter().find(|theme| theme.name == name)
    }

    /// Common files followed by the theme's files
    ///
    /// Returns `None` when the theme is not declared.
    #[must_use]
    pub fn files_for(&self, category: ContentCategory, theme: &str) -> Option<Vec<FileEntry>> {
        let theme_files = self.theme(theme)?.files(category);
        let common = self.common_files(category);

        let mut files = Vec::with_capacity(common.len() + theme_files.len());
        files.extend_from_slice(common);
        files.extend_from_slice(theme_files);
        Some(files)
    }

    /// Every file entry in the schema, common files first
    pub fn all_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.js_files
            .iter()
            .chain(self.css_files.iter())
            .chain(
                self.themes
                    .iter()
                    .flat_map(|theme| theme.js_files.iter().chain(theme.css_files.iter())),
            )
    }
}
