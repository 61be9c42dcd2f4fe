//! Development server command

use anyhow::{Context, Result};
use axum::{http::StatusCode, Router};
use chame::{middleware::BundleLayer, state::ChameState};
use console::style;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

use super::load_config;

/// Serve bundles from a content root
pub struct ServeCommand {
    root: PathBuf,
    config: Option<PathBuf>,
    addr: SocketAddr,
}

impl ServeCommand {
    /// Create a new command instance
    #[must_use]
    pub const fn new(root: PathBuf, config: Option<PathBuf>, addr: SocketAddr) -> Self {
        Self { root, config, addr }
    }

    /// Build the router served by this command
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the content
    /// root is unusable.
    pub fn router(&self) -> Result<Router> {
        let config = load_config(&self.root, self.config.as_deref())?;
        let state = ChameState::from_config(config, self.root.clone())
            .context("Failed to initialize bundle pipeline")?;

        Ok(Router::new()
            .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
            .layer(BundleLayer::new(state))
            .layer(TraceLayer::new_for_http()))
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the router cannot be built, the address cannot be
    /// bound, or the server fails.
    pub async fn execute(&self) -> Result<()> {
        let app = self.router()?;

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        let local = listener.local_addr()?;

        println!(
            "{} {} {}",
            style("Serving").green().bold(),
            style(self.root.display()).cyan(),
            style(format!("on http://{local}")).bold()
        );
        tracing::info!(root = %self.root.display(), addr = %local, "bundle server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        tracing::info!("bundle server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
    }
}
