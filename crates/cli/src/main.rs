//! gitshadow entry point.
//!
//! Loads the JSON configuration, initializes tracing, and runs every
//! configured sync pair sequentially. Any unrecovered error terminates the
//! process with a non-zero status after being logged.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gitshadow_core::{CancelToken, SyncConfig};

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Mirror Git repositories through local shadow clones.
#[derive(Parser, Debug)]
#[command(
    name = "gitshadow",
    version,
    about = "Mirror the full ref set of source repositories to destinations"
)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "./gitshadow.json")]
    config: PathBuf,

    /// Minimum log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = SyncConfig::load_and_validate(&args.config)
        .context("failed to load configuration file")?;

    info!("========================================");
    info!("  gitshadow v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file  : {}", args.config.display());
    info!("Shadow base  : {}", config.shadows_location_base_path.display());
    info!("Repositories : {}", config.repositories.len());
    info!("Sync pairs   : {}", config.sync_options.len());
    info!("========================================");

    let token = CancelToken::new();
    gitshadow_core::sync::run_all(&config, &token).context("sync run failed")?;

    info!("all pairs synced");
    Ok(())
}
