//! Content root initialization command

use anyhow::{Context, Result};
use chame::config::ChameConfig;
use console::style;
use std::fs;
use std::path::{Path, PathBuf};

use super::DEFAULT_CONFIG_FILE;

/// Starter content schema written next to the configuration
const STARTER_SCHEMA: &str = r#"{
  "cssFiles": [ { "path": "/css/site.css" } ],
  "jsFiles": [ { "path": "/js/site.js" } ],
  "themes": [
    { "name": "Default", "cssFiles": [], "jsFiles": [] }
  ]
}
"#;

/// Write a default `chame.toml` and starter schema
pub struct InitCommand {
    dir: PathBuf,
    force: bool,
}

impl InitCommand {
    /// Create a new command instance
    #[must_use]
    pub const fn new(dir: PathBuf, force: bool) -> Self {
        Self { dir, force }
    }

    /// Write the files, returning the paths written
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be written.
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let config = ChameConfig::default();
        let config_path = self.dir.join(DEFAULT_CONFIG_FILE);
        let schema_path = self.dir.join(&config.bundle.schema_path);

        let mut written = Vec::new();
        if self.write_file(&config_path, &config.to_toml()?)? {
            written.push(config_path);
        }
        if self.write_file(&schema_path, STARTER_SCHEMA)? {
            written.push(schema_path);
        }
        Ok(written)
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be written.
    pub fn execute(&self) -> Result<()> {
        let written = self.run()?;
        for path in &written {
            println!("{} {}", style("Created").green().bold(), style(path.display()).cyan());
        }
        if written.is_empty() {
            println!("{}", style("Nothing to do; files already exist (use --force to overwrite)").yellow());
        }
        Ok(())
    }

    /// `false` when the file exists and `--force` was not given
    fn write_file(&self, path: &Path, contents: &str) -> Result<bool> {
        if path.exists() && !self.force {
            return Ok(false);
        }
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }
}
