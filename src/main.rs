//! Cyclecast - headless cycle-synchronized prediction scheduler
//!
//! Polls the countdown of the active cycle, fires one prediction per cycle
//! inside the firing window and verifies it once the cycle's draw arrives.
//!
//! # Usage
//! ```sh
//! MODE=mock cargo run -- --database-url sqlite://data/cyclecast.db
//! ```
//!
//! Configuration is read from the environment (and `.env`); the flags below
//! override the matching variables.

use anyhow::Result;
use clap::Parser;
use cyclecast::application::system::Application;
use cyclecast::config::{Config, Mode};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Countdown and draw source: "mock" or "http" (overrides MODE)
    #[arg(long)]
    mode: Option<String>,

    /// SQLite URL of the draw store and ledger (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Audit log file (overrides AUDIT_LOG_PATH)
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    info!("Cyclecast {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(mode) = args.mode.as_deref() {
        config = config.with_mode(Mode::from_str(mode)?)?;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(path) = args.audit_log {
        config.audit_log_path = path;
    }

    info!(
        "Configuration loaded: Mode={:?}, Database={}, Window={:?}, Slots={}",
        config.mode,
        config.database_url,
        config.cycle.fire_window,
        config.scoring_config.slot_count
    );

    let app = Application::build(config).await?;
    let handle = app.start().await?;

    info!("Scheduler running. Press Ctrl+C to shutdown.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    handle.shutdown().await;
    Ok(())
}
