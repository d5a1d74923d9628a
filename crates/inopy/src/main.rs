//! Inopy - desktop notifications for unread Inoreader articles
//!
//! Main entry point for the Inopy CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{auth, check, config, init};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Inopy - desktop notifications for unread Inoreader articles
#[derive(Parser)]
#[command(name = "inopy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config directory (default: ~/.inopy/config)
    #[arg(long, global = true, env = "INOPY_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check for unread articles and send a notification (default)
    Check(check::CheckArgs),

    /// Authorization management
    Auth(auth::AuthArgs),

    /// Create the config file interactively
    Init(init::InitArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "inopy=debug,inopy_oauth=debug,inopy_client=debug,inopy_config=debug,info"
    } else {
        "inopy=info,inopy_oauth=info,inopy_client=info,inopy_config=info,warn"
    };

    let log_dir = inopy_config::log_dir(cli.config_dir.as_deref())
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "inopy.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "inopy=trace,inopy_oauth=trace,inopy_client=trace,inopy_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        config_dir: cli.config_dir,
        verbose: cli.verbose,
    };

    match cli.command {
        None => check::run(check::CheckArgs::default(), &ctx).await,
        Some(Commands::Check(args)) => check::run(args, &ctx).await,
        Some(Commands::Auth(args)) => auth::run(args, &ctx).await,
        Some(Commands::Init(args)) => init::run(args, &ctx).await,
        Some(Commands::Config(args)) => config::run(args, &ctx).await,
    }
}
