//! fusejob - resilient job harness for an external media tool
//!
//! Main entry point for the fusejob CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, diagnose, health, job, run, serve, strategies};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// fusejob - run an external media tool through a fallback strategy catalog
#[derive(Parser)]
#[command(name = "fusejob")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of discovery
    #[arg(short, long, global = true, env = "FUSEJOB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a job from command-line inputs
    Run(run::RunArgs),

    /// Process a raw JSON job from a file or stdin
    Job(job::JobArgs),

    /// Check that the external tool is installed
    Health(health::HealthArgs),

    /// Print an environment report for fixing the strategy catalog
    Diagnose(diagnose::DiagnoseArgs),

    /// Show the resolved strategy catalog
    Strategies(strategies::StrategiesArgs),

    /// Start the HTTP job server
    Serve(serve::ServeArgs),

    /// Inspect or initialize configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = match cli.config {
        Some(ref path) => fusejob_config::LoadedConfig {
            config: fusejob_config::load_config_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            sources: vec![fusejob_config::ConfigSource {
                path: path.clone(),
                loaded: true,
            }],
            warnings: Vec::new(),
        },
        None => fusejob_config::load_config(None).context("failed to load config")?,
    };

    // Initialize tracing: console on stderr, plus a daily JSON file when configured.
    // Stdout is reserved for command output.
    let filter = if cli.verbose {
        "fusejob=debug,fusejob_engine=debug,fusejob_server=debug,fusejob_config=debug,info"
    } else {
        "fusejob=info,fusejob_engine=info,fusejob_server=info,warn"
    };
    let console_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    use tracing_subscriber::prelude::*;
    let (file_layer, _guard) = match loaded.config.logging().dir {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "fusejob.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "fusejob=trace,fusejob_engine=trace,fusejob_server=debug,fusejob_config=debug,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    for path in loaded.loaded_from() {
        tracing::debug!(path = %path.display(), "Loaded config");
    }

    // Create context for commands
    let ctx = commands::Context {
        config: loaded.config,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Job(args) => job::run(args, &ctx).await,
        Commands::Health(args) => health::run(args, &ctx).await,
        Commands::Diagnose(args) => diagnose::run(args, &ctx).await,
        Commands::Strategies(args) => strategies::run(args, &ctx).await,
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
