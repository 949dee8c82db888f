//! Regime Trader Server - Headless trading system
//!
//! Streams ticks from the mock random-walk source through one trading
//! instance per configured symbol. Events are rendered as log lines, or as
//! JSON lines with `--json-events`.
//!
//! # Usage
//! ```sh
//! SYMBOLS=BTC-USDT,ETH-USDT RUST_LOG=info cargo run --bin server
//! cargo run --bin server -- --config instances.toml
//! ```
//!
//! # Environment Variables
//! - `SYMBOLS` - Comma separated symbols, one instance each (default: BTC-USDT)
//! - `INSTANCES_FILE` - TOML instance definitions, replaces `SYMBOLS`
//! - `EXECUTION_MODE` - `simulated` (default) or `live`

use anyhow::Result;
use clap::Parser;
use regime_trader::application::system::Application;
use regime_trader::config::{Config, ConfigSources, split_symbols};
use regime_trader::domain::events::{JsonListener, LoggingListener};
use regime_trader::infrastructure::mock::MockTickSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "server", version, about = "Regime-aware trading pipeline")]
struct Args {
    /// TOML instances file (overrides INSTANCES_FILE and SYMBOLS)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma separated symbols (overrides SYMBOLS)
    #[arg(long)]
    symbols: Option<String>,

    /// Mock tick interval in milliseconds
    #[arg(long, default_value_t = 250)]
    tick_interval_ms: u64,

    /// Mock price walk seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Emit trading events as JSON lines instead of log messages
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Regime Trader Server {} starting...", env!("CARGO_PKG_VERSION"));

    let sources = ConfigSources {
        instances_file: args.config.clone(),
        symbols: args.symbols.as_deref().map(split_symbols),
    };
    let config = Config::from_env_with(&sources)?;
    info!(
        "Configuration loaded: Execution={:?}, Symbols={:?}",
        config.execution_mode,
        config.symbols()
    );

    let app = Application::build(config).await?;
    if args.json_events {
        app.subscribe(Arc::new(JsonListener)).await;
    } else {
        app.subscribe(Arc::new(LoggingListener)).await;
    }

    let source = Arc::new(MockTickSource::new(
        Duration::from_millis(args.tick_interval_ms),
        args.seed,
    ));

    info!("Starting trading system...");
    let handle = app.start(source).await?;
    info!("Server running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");
    handle.shutdown().await;

    Ok(())
}
