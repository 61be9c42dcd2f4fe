//! Content schema validation command

use anyhow::{Context, Result};
use chame::config::ChameConfig;
use chame::schema::ContentSchema;
use chame::storage::normalize_path;
use chame::theme::is_valid_theme_name;
use console::style;
use std::path::{Path, PathBuf};

use super::load_config;

/// Problems found in a content schema
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Number of declared themes
    pub themes: usize,
    /// Number of file entries
    pub files: usize,
    /// Theme names that can never be selected
    pub invalid_themes: Vec<String>,
    /// Entries whose path cannot be resolved below the root
    pub invalid_paths: Vec<String>,
    /// Entries whose file does not exist
    pub missing_files: Vec<String>,
}

impl CheckReport {
    /// Whether no problem was found
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.invalid_themes.is_empty() && self.invalid_paths.is_empty() && self.missing_files.is_empty()
    }
}

/// Validate the schema of a content root
pub struct CheckCommand {
    root: PathBuf,
    config: Option<PathBuf>,
}

impl CheckCommand {
    /// Create a new command instance
    #[must_use]
    pub const fn new(root: PathBuf, config: Option<PathBuf>) -> Self {
        Self { root, config }
    }

    /// Check the schema and every file it lists
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the schema cannot be loaded.
    pub fn run(&self) -> Result<CheckReport> {
        let config = load_config(&self.root, self.config.as_deref())?;
        check_root(&self.root, &config)
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot run or finds problems.
    pub fn execute(&self) -> Result<()> {
        let report = self.run()?;

        println!(
            "{} {} themes, {} file entries",
            style("Checked").green().bold(),
            report.themes,
            report.files
        );
        for theme in &report.invalid_themes {
            println!("  {} invalid theme name {theme:?}", style("✗").red());
        }
        for path in &report.invalid_paths {
            println!("  {} invalid path {path:?}", style("✗").red());
        }
        for path in &report.missing_files {
            println!("  {} missing file {path}", style("✗").yellow());
        }

        if !report.is_clean() {
            anyhow::bail!("Content schema has problems");
        }
        println!("{}", style("✓ Content schema is valid").green().bold());
        Ok(())
    }
}

/// Validate the schema found below `root`
///
/// Duplicate theme names and malformed JSON are hard errors.
///
/// # Errors
///
/// Returns an error if the schema cannot be read or parsed.
pub fn check_root(root: &Path, config: &ChameConfig) -> Result<CheckReport> {
    let schema_path = root.join(normalize_path(&config.bundle.schema_path)?);
    let bytes = std::fs::read(&schema_path)
        .with_context(|| format!("Failed to read schema {}", schema_path.display()))?;
    let schema = ContentSchema::from_json(&bytes)
        .with_context(|| format!("Invalid schema {}", schema_path.display()))?;

    let mut report = CheckReport {
        themes: schema.themes.len(),
        ..CheckReport::default()
    };

    for theme in &schema.themes {
        if !is_valid_theme_name(&theme.name) {
            report.invalid_themes.push(theme.name.clone());
        }
    }

    for entry in schema.all_files() {
        report.files += 1;
        let Ok(relative) = normalize_path(&entry.path) else {
            report.invalid_paths.push(entry.path.clone());
            continue;
        };
        if !root.join(&relative).is_file() {
            report.missing_files.push(entry.path.clone());
        }
    }

    Ok(report)
}
