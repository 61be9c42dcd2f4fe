//! Configuration management for chame
//!
//! Configuration is loaded with figment from multiple sources with clear
//! precedence:
//!
//! 1. Environment variables (highest priority, `CHAME_` prefix, `__` nesting)
//! 2. The TOML file passed to [`ChameConfig::load_from`]
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # chame.toml
//! environment = "production"
//!
//! [bundle]
//! js_path = "/chame/js"
//! css_path = "/chame/css"
//! schema_path = "chame.json"
//! default_theme = "Default"
//! theme_cookie = "theme"
//! etag_enabled = true
//!
//! [cache]
//! mode = "enabled_except_in_development"
//! ttl_secs = 300
//!
//! [views]
//! themes_root = "themes"
//! locations = ["views/{name}.html", "views/shared/{name}.html"]
//! ```
//!
//! Environment overrides use double underscores between section and key,
//! e.g. `CHAME_BUNDLE__DEFAULT_THEME=Blue` or `CHAME_CACHE__MODE=disabled`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::cache::CacheMode;
use crate::error::{ChameError, ChameResult};
use crate::theme::is_valid_theme_name;

/// Runtime environment of the hosting application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development; caching may be switched off
    Development,
    /// Pre-production
    Staging,
    /// Production
    #[default]
    Production,
}

impl Environment {
    /// Whether this is the development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        })
    }
}

impl FromStr for Environment {
    type Err = ChameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ChameError::Config(format!("unknown environment: {other}"))),
        }
    }
}

/// Bundle endpoint and pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSettings {
    /// Virtual path serving JavaScript bundles
    pub js_path: String,

    /// Virtual path serving CSS bundles
    pub css_path: String,

    /// Location of the JSON content schema, relative to the content root
    pub schema_path: String,

    /// Theme used when the request does not name one
    pub default_theme: Option<String>,

    /// Cookie carrying the theme name
    pub theme_cookie: Option<String>,

    /// Compute fingerprints and answer conditional requests
    pub etag_enabled: bool,

    /// Encoding label of the source files
    pub charset: String,

    /// Value of the `Cache-Control` header on bundle responses
    pub cache_control: Option<String>,

    /// Priority of the built-in file loader (lower runs first)
    pub file_loader_priority: i32,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            js_path: "/chame/js".to_string(),
            css_path: "/chame/css".to_string(),
            schema_path: "chame.json".to_string(),
            default_theme: None,
            theme_cookie: Some("theme".to_string()),
            etag_enabled: true,
            charset: "utf-8".to_string(),
            cache_control: None,
            file_loader_priority: 0,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Caching mode
    pub mode: CacheMode,

    /// Absolute lifetime of cache entries in seconds
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mode: CacheMode::EnabledExceptInDevelopment,
            ttl_secs: 300, // 5 minutes
        }
    }
}

/// Themed view lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Directory holding one sub-directory per theme
    pub themes_root: String,

    /// Default view locations; `{name}` is replaced by the view name
    pub locations: Vec<String>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            themes_root: "themes".to_string(),
            locations: vec![
                "views/{name}.html".to_string(),
                "views/shared/{name}.html".to_string(),
            ],
        }
    }
}

/// Complete chame configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChameConfig {
    /// Runtime environment
    #[serde(default)]
    pub environment: Environment,

    /// Bundle endpoint settings
    #[serde(default)]
    pub bundle: BundleSettings,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// View lookup settings
    #[serde(default)]
    pub views: ViewSettings,
}

impl ChameConfig {
    /// Environment variable prefix
    pub const ENV_PREFIX: &'static str = "CHAME_";

    /// Load defaults overridden by `CHAME_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ChameError::Config`] if a value has the wrong type or the
    /// result fails [`validate`](Self::validate).
    pub fn load() -> ChameResult<Self> {
        Self::extract(Self::figment())
    }

    /// Load a TOML file, overridden by `CHAME_*` environment variables
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use chame::config::ChameConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = ChameConfig::load_from("./chame.toml")?;
    /// println!("serving JS at {}", config.bundle.js_path);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ChameError::Config`] if the file cannot be parsed or the result
    /// fails [`validate`](Self::validate).
    pub fn load_from(path: impl AsRef<Path>) -> ChameResult<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> ChameResult<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| ChameError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants
    ///
    /// # Errors
    ///
    /// Returns [`ChameError::Config`] if a virtual path does not start with
    /// `/`, both categories share one path, the default theme name is invalid,
    /// or the schema path is empty.
    pub fn validate(&self) -> ChameResult<()> {
        let bundle = &self.bundle;
        for path in [&bundle.js_path, &bundle.css_path] {
            if !path.starts_with('/') || path.len() < 2 {
                return Err(ChameError::Config(format!(
                    "bundle path must start with '/' and name a segment: {path:?}"
                )));
            }
        }
        if bundle.js_path.trim_end_matches('/') == bundle.css_path.trim_end_matches('/') {
            return Err(ChameError::Config(
                "js_path and css_path must differ".to_string(),
            ));
        }
        if let Some(theme) = &bundle.default_theme {
            if !is_valid_theme_name(theme) {
                return Err(ChameError::Config(format!("invalid default theme: {theme:?}")));
            }
        }
        if bundle.schema_path.trim().is_empty() {
            return Err(ChameError::Config("schema_path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Serialize to TOML, as written by `chame init`
    ///
    /// # Errors
    ///
    /// Returns [`ChameError::Config`] if serialization fails.
    pub fn to_toml(&self) -> ChameResult<String> {
        toml::to_string_pretty(self).map_err(|e| ChameError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ChameConfig::default();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bundle.js_path, "/chame/js");
        assert_eq!(config.bundle.css_path, "/chame/css");
        assert_eq!(config.bundle.schema_path, "chame.json");
        assert!(config.bundle.etag_enabled);
        assert_eq!(config.cache.mode, CacheMode::EnabledExceptInDevelopment);
        assert_eq!(config.cache.ttl_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chame.toml");
        std::fs::write(
            &path,
            r#"
environment = "development"

[bundle]
js_path = "/assets/js"
default_theme = "Blue"
etag_enabled = false

[cache]
mode = "disabled"
"#,
        )
        .unwrap();

        let config = ChameConfig::load_from(&path).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bundle.js_path, "/assets/js");
        assert_eq!(config.bundle.css_path, "/chame/css");
        assert_eq!(config.bundle.default_theme.as_deref(), Some("Blue"));
        assert!(!config.bundle.etag_enabled);
        assert_eq!(config.cache.mode, CacheMode::Disabled);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ChameConfig::load_from(temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.bundle, BundleSettings::default());
    }

    #[test]
    fn test_invalid_default_theme_rejected() {
        let mut config = ChameConfig::default();
        config.bundle.default_theme = Some("..".to_string());
        assert!(matches!(config.validate(), Err(ChameError::Config(_))));
    }

    #[test]
    fn test_identical_paths_rejected() {
        let mut config = ChameConfig::default();
        config.bundle.css_path = "/chame/js/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ChameConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: ChameConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("Production".parse::<Environment>().unwrap(), Environment::Production);
        assert!("moon".parse::<Environment>().is_err());
        assert!(Environment::Development.is_development());
    }
}
