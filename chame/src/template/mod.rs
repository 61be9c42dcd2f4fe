//! Themed view lookup
//!
//! Applications that render server-side views can let a theme override any
//! view by placing a file with the same relative path below
//! `<themes_root>/<theme>/`. [`ThemeViewLocations`] expands the default search
//! locations so that the themed copy is found first.
//!
//! ```rust
//! use chame::template::ThemeViewLocations;
//! use chame::theme::Theme;
//!
//! let locations = ThemeViewLocations::new("themes", ["views/{name}.html"]);
//! let theme = Theme::new("Blue").unwrap();
//! assert_eq!(
//!     locations.locations_for(Some(&theme)),
//!     vec!["themes/Blue/views/{name}.html", "views/{name}.html"],
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::config::ViewSettings;
use crate::theme::Theme;

/// Placeholder replaced by the view name
pub const NAME_PLACEHOLDER: &str = "{name}";

/// View cache discriminator used when no theme applies
const UNTHEMED_KEY: &str = "default";

/// Expands view search locations with theme-specific variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeViewLocations {
    themes_root: String,
    locations: Vec<String>,
}

impl ThemeViewLocations {
    /// Create an expander
    #[must_use]
    pub fn new<I, S>(themes_root: impl Into<String>, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            themes_root: themes_root.into().trim_end_matches('/').to_string(),
            locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an expander from the `views` configuration section
    #[must_use]
    pub fn from_settings(settings: &ViewSettings) -> Self {
        Self::new(settings.themes_root.clone(), settings.locations.iter().cloned())
    }

    /// Themed variants of `defaults`, followed by `defaults` unchanged
    #[must_use]
    pub fn expand(&self, theme: &Theme, defaults: &[String]) -> Vec<String> {
        defaults
            .iter()
            .map(|location| {
                format!(
                    "{}/{}/{}",
                    self.themes_root,
                    theme,
                    location.trim_start_matches('/')
                )
            })
            .chain(defaults.iter().cloned())
            .collect()
    }

    /// Search locations for a request, themed ones first when a theme applies
    #[must_use]
    pub fn locations_for(&self, theme: Option<&Theme>) -> Vec<String> {
        theme.map_or_else(
            || self.locations.clone(),
            |theme| self.expand(theme, &self.locations),
        )
    }

    /// First existing file for the view `name` below `root`
    ///
    /// Names with empty, `.` or `..` segments are never looked up.
    pub async fn find_template(&self, root: &Path, theme: Option<&Theme>, name: &str) -> Option<PathBuf> {
        if !is_safe_view_name(name) {
            tracing::warn!(view = name, "refusing to look up view with an unsafe name");
            return None;
        }

        for location in self.locations_for(theme) {
            let candidate = root.join(location.replace(NAME_PLACEHOLDER, name));
            let is_file = tokio::fs::metadata(&candidate)
                .await
                .is_ok_and(|metadata| metadata.is_file());
            if is_file {
                tracing::trace!(view = name, path = %candidate.display(), "view found");
                return Some(candidate);
            }
        }
        tracing::debug!(view = name, theme = ?theme.map(Theme::as_str), "view not found");
        None
    }

    /// View cache discriminator for a theme
    ///
    /// Views compiled for one theme must not be served for another.
    #[must_use]
    pub fn cache_key(theme: Option<&Theme>) -> String {
        theme.map_or_else(|| UNTHEMED_KEY.to_string(), |theme| format!("theme:{theme}"))
    }
}

impl Default for ThemeViewLocations {
    fn default() -> Self {
        Self::from_settings(&ViewSettings::default())
    }
}

fn is_safe_view_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split(['/', '\\'])
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}
