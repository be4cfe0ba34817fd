//! Opportunity reporting sinks
//!
//! The detector hands every opportunity to an `OpportunitySink` exactly
//! once per cycle. Emission is fire-and-forget: sinks never block the
//! detector and never report back.

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::core::types::Opportunity;

/// Receiver of detected opportunities
pub trait OpportunitySink: Send + Sync {
    fn emit(&self, opportunity: &Opportunity);
}

/// Structured log lines: one `warn` summary plus one `info` per leg
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl OpportunitySink for LogSink {
    fn emit(&self, opportunity: &Opportunity) {
        match opportunity {
            Opportunity::Triangular {
                exchange,
                path,
                profit_percentage,
                legs,
                ..
            } => {
                warn!(
                    exchange = %exchange,
                    path = %path.join(" -> "),
                    profit_pct = %format!("{:.4}", profit_percentage),
                    "[TRIANGULAR] Opportunity detected"
                );
                for (step, leg) in legs.iter().enumerate() {
                    info!(
                        exchange = %exchange,
                        step = step + 1,
                        symbol = %leg.symbol,
                        side = %leg.side,
                        price = leg.price,
                        "[TRIANGULAR] Leg"
                    );
                }
            }
            Opportunity::Spatial {
                symbol,
                buy_exchange,
                sell_exchange,
                buy_price,
                sell_price,
                profit_percentage,
                ..
            } => {
                warn!(
                    symbol = %symbol,
                    buy_exchange = %buy_exchange,
                    sell_exchange = %sell_exchange,
                    profit_pct = %format!("{:.4}", profit_percentage),
                    "[SPATIAL] Opportunity detected"
                );
                info!(
                    symbol = %symbol,
                    buy_exchange = %buy_exchange,
                    buy_price = buy_price,
                    sell_exchange = %sell_exchange,
                    sell_price = sell_price,
                    "[SPATIAL] Prices"
                );
            }
        }
    }
}

/// Forwards opportunities to any number of `broadcast` subscribers
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Opportunity>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Opportunity> {
        self.tx.subscribe()
    }
}

impl OpportunitySink for BroadcastSink {
    fn emit(&self, opportunity: &Opportunity) {
        // No receivers is fine
        let _ = self.tx.send(opportunity.clone());
    }
}
