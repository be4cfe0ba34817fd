//! Arbitrage scanner entry point
//!
//! 1. Loads configuration (`CONFIG_PATH`, default `config.yaml`)
//! 2. Starts one feed supervisor per configured exchange
//! 3. Runs the detector loop and logs opportunities
//! 4. Stops cleanly on Ctrl+C

use std::path::Path;
use std::sync::Arc;

use arb_scanner::config::{self, logging::init_logging};
use arb_scanner::core::{run_scanner, ExchangeOutcome, LogSink, SupervisorOutcome};
use arb_scanner::feeds::JsonFeedFactory;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenvy::dotenv().ok();

    init_logging();

    let path = config::config_path();
    info!(path = %path, "Loading configuration");
    let config = match config::load_config(Path::new(&path)) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Configuration failed");
            std::process::exit(1);
        }
    };

    info!(
        exchanges = ?config.exchange_ids(),
        symbols = config.all_symbols().len(),
        triangles = config.triangles.len(),
        min_profit_pct = config.min_profit_percentage,
        testnet = config.testnet,
        "Configuration loaded"
    );
    if config.exchanges.is_empty() {
        warn!("No exchanges configured");
    }

    let config = Arc::new(config);
    let factory = Arc::new(JsonFeedFactory::from_config(&config));
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("[SHUTDOWN] Graceful shutdown initiated");
                shutdown.cancel();
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for Ctrl+C signal");
            }
        }
    });

    let summary = run_scanner(config, factory, Arc::new(LogSink), cancel).await?;

    for (exchange, outcome) in &summary.exchanges {
        match outcome {
            ExchangeOutcome::Finished(report) => match &report.outcome {
                SupervisorOutcome::Stopped => info!(exchange = %exchange, "Stopped"),
                SupervisorOutcome::Abandoned { attempts, last_error } => {
                    warn!(exchange = %exchange, attempts = attempts, error = %last_error, "Abandoned")
                }
            },
            ExchangeOutcome::Panicked(reason) => error!(exchange = %exchange, reason = %reason, "Panicked"),
        }
    }

    info!("[SHUTDOWN] Clean exit");
    Ok(())
}
