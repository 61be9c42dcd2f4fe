//! Bundle rendering command

use anyhow::{Context, Result};
use bytes::Bytes;
use chame::content::{ContentCategory, ResponseOutcome};
use chame::context::{RequestContext, RequestFilter};
use chame::handlers::{dispatch, merge};
use chame::state::ChameState;
use chame::theme::Theme;
use console::style;
use std::io::Write;
use std::path::PathBuf;

use super::load_config;

/// Print the bundle a browser would receive
pub struct BundleCommand {
    root: PathBuf,
    config: Option<PathBuf>,
    theme: String,
    category: ContentCategory,
    filter: Option<String>,
    output: Option<PathBuf>,
}

impl BundleCommand {
    /// Create a new command instance
    #[must_use]
    pub const fn new(
        root: PathBuf,
        config: Option<PathBuf>,
        theme: String,
        category: ContentCategory,
        filter: Option<String>,
        output: Option<PathBuf>,
    ) -> Self {
        Self {
            root,
            config,
            theme,
            category,
            filter,
            output,
        }
    }

    /// Build the bundle, `None` when no file contributes
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded, the theme name
    /// is invalid, or a loader fails.
    pub async fn render(&self) -> Result<Option<Bytes>> {
        let config = load_config(&self.root, self.config.as_deref())?;
        let state = ChameState::from_config(config, self.root.clone())?;
        let theme = Theme::new(self.theme.clone())?;
        render_bundle(&state, theme, self.category, self.filter.as_deref()).await
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be rendered, is empty, or cannot
    /// be written.
    pub async fn execute(&self) -> Result<()> {
        let Some(bundle) = self.render().await? else {
            anyhow::bail!(
                "No {} content for theme '{}'",
                self.category,
                self.theme
            );
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, &bundle)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!(
                    "{} {} bytes to {}",
                    style("Wrote").green().bold(),
                    bundle.len(),
                    style(path.display()).cyan()
                );
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&bundle).context("Failed to write bundle")?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// Run every loader for a synthetic request and merge the results
///
/// # Errors
///
/// Returns an error if the filter cannot be compiled, no loader serves the
/// category, a loader fails, or the outcomes cannot be merged.
pub async fn render_bundle(
    state: &ChameState,
    theme: Theme,
    category: ContentCategory,
    filter: Option<&str>,
) -> Result<Option<Bytes>> {
    let filter = filter.map(RequestFilter::new).transpose()?;
    let (parts, ()) = http::Request::builder()
        .uri(category_path(state, category))
        .body(())?
        .into_parts();

    let ctx = RequestContext::new(parts, category, filter, theme, state.loaders_for(category), false)?;
    let responses = dispatch(&ctx, false).await?;
    match merge(responses)? {
        ResponseOutcome::Ok { payload, .. } => Ok(payload),
        ResponseOutcome::NotModified { .. } | ResponseOutcome::NotFound => Ok(None),
    }
}

fn category_path(state: &ChameState, category: ContentCategory) -> String {
    let bundle = &state.config().bundle;
    match category {
        ContentCategory::JavaScript => bundle.js_path.clone(),
        ContentCategory::Css => bundle.css_path.clone(),
    }
}
