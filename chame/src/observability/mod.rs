//! Observability (structured logging)
//!
//! Every component logs through `tracing` with structured fields. This module
//! installs the subscriber: pretty output during development, JSON lines in
//! release builds, written to stderr and filtered by `RUST_LOG` when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-oriented output
    Pretty,
    /// Single-line, human-oriented output
    Compact,
    /// One JSON object per event
    Json,
    /// `Pretty` in debug builds, `Json` otherwise
    #[default]
    Auto,
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name recorded with the startup event
    pub service_name: String,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let default_filter = if cfg!(debug_assertions) {
            "debug,chame=trace"
        } else {
            "info"
        };
        Self {
            service_name: "chame".to_string(),
            default_filter: default_filter.to_string(),
            format: LogFormat::Auto,
        }
    }
}

impl ObservabilityConfig {
    /// Create new observability config
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the filter used when `RUST_LOG` is not set
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// Set the output format
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    const fn effective_format(&self) -> LogFormat {
        match self.format {
            LogFormat::Auto if cfg!(debug_assertions) => LogFormat::Pretty,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        }
    }
}

/// Initialize logging with the default configuration
///
/// # Example
///
/// ```rust,no_run
/// use chame::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    init_with(&ObservabilityConfig::default())
}

/// Initialize logging
///
/// # Errors
///
/// Returns an error if the filter is malformed or a global subscriber is
/// already installed.
pub fn init_with(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)?,
    };
    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout is left to the application (e.g. `chame bundle`)
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    match config.effective_format() {
        LogFormat::Json => registry.with(fmt.json()).try_init()?,
        LogFormat::Compact => registry.with(fmt.compact()).try_init()?,
        LogFormat::Pretty | LogFormat::Auto => registry.with(fmt.pretty()).try_init()?,
    }

    tracing::debug!(service = %config.service_name, "logging initialized");
    Ok(())
}
