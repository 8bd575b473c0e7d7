//! marklist — keep a local item database in sync with remote awesome lists.
//!
//! # Usage
//!
//! ```text
//! marklist [--config marklist.yaml] sync [SOURCES]... [--force] [--rebuild] [--limit N]
//! marklist [--config marklist.yaml] status [--json]
//! marklist [--config marklist.yaml] diff <SOURCE> <FILE>
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG` (default `info`).

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, status::StatusArgs, sync::SyncArgs};
use marklist_core::config::DEFAULT_CONFIG_FILE;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "marklist",
    version,
    about = "Incrementally sync curated markdown lists into a local item database",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch configured sources and merge changed items.
    Sync(SyncArgs),

    /// Show freshness of every configured source.
    Status(StatusArgs),

    /// Show a unified diff between the stored and the remote document.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(&cli.config),
        Commands::Status(args) => args.run(&cli.config),
        Commands::Diff(args) => args.run(&cli.config),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
