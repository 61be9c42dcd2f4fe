//! CLI command implementations

pub mod bundle;
pub mod check;
pub mod init;
pub mod serve;

pub use bundle::BundleCommand;
pub use check::{CheckCommand, CheckReport};
pub use init::InitCommand;
pub use serve::ServeCommand;

use anyhow::{Context, Result};
use chame::config::ChameConfig;
use std::path::{Path, PathBuf};

/// Config file looked up in the content root when none is given
pub const DEFAULT_CONFIG_FILE: &str = "chame.toml";

/// Load the configuration for a content root
///
/// An explicit `config` path must exist; the default `chame.toml` in `root` is
/// optional.
///
/// # Errors
///
/// Returns an error if an explicit config file is missing or the configuration
/// is invalid.
pub fn load_config(root: &Path, config: Option<&Path>) -> Result<ChameConfig> {
    let path: PathBuf = match config {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => root.join(DEFAULT_CONFIG_FILE),
    };

    ChameConfig::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
