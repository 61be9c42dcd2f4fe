//! chame CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Result;
use chame::content::ContentCategory;
use chame::observability::{self, LogFormat, ObservabilityConfig};
use chame_cli::{BundleCommand, CheckCommand, InitCommand, ServeCommand};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chame")]
#[command(version)]
#[command(about = "Serve, build and check themed JavaScript/CSS bundles", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogArg::Auto, global = true)]
    log_format: LogArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve bundles from a content root
    Serve {
        /// Content root holding the schema and the bundle files
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Configuration file (defaults to `<root>/chame.toml`)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// Print the bundle for a theme
    Bundle {
        /// Content root holding the schema and the bundle files
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Configuration file (defaults to `<root>/chame.toml`)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Theme name
        #[arg(long)]
        theme: String,
        /// Bundle category
        #[arg(long, value_enum)]
        category: CategoryArg,
        /// Filter selecting tagged files
        #[arg(long)]
        filter: Option<String>,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Validate the content schema and the files it lists
    Check {
        /// Content root holding the schema and the bundle files
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Configuration file (defaults to `<root>/chame.toml`)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a default configuration and starter schema
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    /// JavaScript bundle
    Js,
    /// Stylesheet bundle
    Css,
}

impl From<CategoryArg> for ContentCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Js => Self::JavaScript,
            CategoryArg::Css => Self::Css,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogArg {
    /// Pretty in debug builds, JSON in release builds
    Auto,
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output
    Compact,
    /// JSON lines
    Json,
}

impl From<LogArg> for LogFormat {
    fn from(arg: LogArg) -> Self {
        match arg {
            LogArg::Auto => Self::Auto,
            LogArg::Pretty => Self::Pretty,
            LogArg::Compact => Self::Compact,
            LogArg::Json => Self::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only the server logs by default; the other commands print their own output
    let default_filter = match cli.command {
        Commands::Serve { .. } => "info,chame=debug",
        _ => "warn",
    };
    observability::init_with(
        &ObservabilityConfig::new("chame-cli")
            .with_filter(default_filter)
            .with_format(cli.log_format.into()),
    )?;

    match cli.command {
        Commands::Serve { root, config, addr } => {
            ServeCommand::new(root, config, addr).execute().await?;
        }
        Commands::Bundle {
            root,
            config,
            theme,
            category,
            filter,
            output,
        } => {
            BundleCommand::new(root, config, theme, category.into(), filter, output)
                .execute()
                .await?;
        }
        Commands::Check { root, config } => {
            CheckCommand::new(root, config).execute()?;
        }
        Commands::Init { dir, force } => {
            InitCommand::new(dir, force).execute()?;
        }
    }

    Ok(())
}
