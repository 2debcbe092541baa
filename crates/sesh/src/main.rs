//! sesh - cookie session counter server
//!
//! Main entry point for the sesh CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// sesh - server-side cookie sessions with idle expiry
#[derive(Parser)]
#[command(name = "sesh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the session counter server
    Start(start::StartArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_log_dir = match &cli.command {
        Commands::Start(args) => Some(args.log_dir.clone().unwrap_or_else(default_log_dir)),
        Commands::Config(_) => None,
    };
    let _guard = init_tracing(cli.verbose, file_log_dir);

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

fn default_log_dir() -> PathBuf {
    sesh_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Console (human-readable) logging, plus a daily JSON file when serving.
fn init_tracing(
    verbose: bool,
    file_log_dir: Option<PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "sesh=debug,sesh_session=debug,sesh_server=debug,sesh_config=debug,info"
    } else {
        "sesh=info,sesh_session=info,sesh_server=info,warn"
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(tracing_subscriber::EnvFilter::new(filter));

    let (file, guard) = match file_log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "sesh.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "sesh=trace,sesh_session=trace,sesh_server=trace,sesh_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}
