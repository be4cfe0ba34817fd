//! Scanner runtime
//!
//! Spawns one `FeedSupervisor` per configured exchange plus one detector
//! loop, all sharing a single `PriceStore`. Tasks are independent: an
//! abandoned or panicking supervisor never stops the others or the
//! detector, and the detector is never restarted.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::core::detector::{ArbitrageDetector, DetectorConfig};
use crate::core::sink::OpportunitySink;
use crate::core::store::PriceStore;
use crate::core::supervisor::{FeedSupervisor, SupervisorConfig, SupervisorOutcome, SupervisorReport};
use crate::error::AppError;
use crate::feeds::FeedFactory;

/// How one exchange's supervisor ended
#[derive(Debug)]
pub enum ExchangeOutcome {
    Finished(SupervisorReport),
    Panicked(String),
}

/// Result of a full scanner run
pub struct ScannerSummary {
    /// Per exchange, in configuration order
    pub exchanges: Vec<(String, ExchangeOutcome)>,
    /// The shared store as it was when the scanner stopped
    pub store: Arc<PriceStore>,
}

impl ScannerSummary {
    /// Exchanges that exhausted their retries
    pub fn abandoned(&self) -> Vec<&str> {
        self.exchanges
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    ExchangeOutcome::Finished(SupervisorReport {
                        outcome: SupervisorOutcome::Abandoned { .. },
                        ..
                    })
                )
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Run every supervisor and the detector until `cancel` fires.
///
/// Supervisors that give up early are reported in the summary; the
/// detector keeps scanning whatever the remaining exchanges provide.
pub async fn run_scanner(
    config: Arc<AppConfig>,
    factory: Arc<dyn FeedFactory>,
    sink: Arc<dyn OpportunitySink>,
    cancel: CancellationToken,
) -> Result<ScannerSummary, AppError> {
    let store = Arc::new(PriceStore::new(config.enforce_liquidity_gate));
    let detector = ArbitrageDetector::new(
        DetectorConfig::from_app_config(&config)?,
        Arc::clone(&store),
        sink,
    );

    let mut supervisors: Vec<(String, JoinHandle<SupervisorReport>)> = Vec::new();
    for exchange_id in config.exchange_ids() {
        let Some(sup_config) = SupervisorConfig::from_app_config(&config, &exchange_id) else {
            continue;
        };
        let supervisor = FeedSupervisor::new(sup_config, Arc::clone(&factory), Arc::clone(&store));
        let cancel = cancel.clone();
        info!(exchange = %exchange_id, "Starting feed supervisor");
        supervisors.push((
            exchange_id,
            tokio::spawn(async move { supervisor.run(cancel).await }),
        ));
    }

    if supervisors.is_empty() {
        warn!("No exchanges configured, detector will idle");
    }

    let detector_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { detector.run(cancel).await })
    };

    info!(
        exchanges = supervisors.len(),
        liquidity_gate = store.liquidity_gate_enabled(),
        "Scanner running"
    );

    let mut exchanges = Vec::with_capacity(supervisors.len());
    for (exchange_id, handle) in supervisors {
        let outcome = match handle.await {
            Ok(report) => {
                if let SupervisorOutcome::Abandoned { attempts, last_error } = &report.outcome {
                    warn!(
                        exchange = %exchange_id,
                        attempts = attempts,
                        error = %last_error,
                        "Exchange abandoned, continuing with the others"
                    );
                }
                ExchangeOutcome::Finished(report)
            }
            Err(e) => {
                error!(exchange = %exchange_id, error = %e, "Feed supervisor panicked");
                ExchangeOutcome::Panicked(e.to_string())
            }
        };
        exchanges.push((exchange_id, outcome));
    }

    if let Err(e) = detector_task.await {
        error!(error = %e, "Detector task panicked");
    }

    info!("Scanner stopped");
    Ok(ScannerSummary { exchanges, store })
}
