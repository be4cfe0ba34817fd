//! Arbitrage opportunity detector.
//!
//! Every cycle runs two read-only scans over the `PriceStore`:
//! - triangular: per exchange, per triangle `(A/C, B/A, B/C)`
//! - spatial: per symbol, per ordered pair of exchanges
//!
//! Both report raw profit. Trading fees are not deducted anywhere; callers
//! fold expected fees into `min_profit_percentage`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::sink::OpportunitySink;
use crate::core::store::PriceStore;
use crate::core::triangle::{discover_triangles, Triangle};
use crate::core::types::{current_time_ms, EnhancedQuote, Opportunity, Side, TradeLeg};
use crate::error::AppError;

/// Configuration for the arbitrage detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Report strictly above this raw profit (percent)
    pub min_profit_percentage: f64,
    /// Staleness window passed to the store
    pub max_age_seconds: f64,
    pub min_volume_usd_triangular: f64,
    pub min_volume_usd_spatial: f64,
    /// Cycle cadence (default 50ms)
    pub interval: Duration,
    /// Curated triangles scanned on every exchange
    pub triangles: Vec<Triangle>,
    /// Add triangles discovered from `exchange_symbols`
    pub discover_triangles: bool,
    /// Configured symbol universe per exchange
    pub exchange_symbols: BTreeMap<String, Vec<String>>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_profit_percentage: 0.5,
            max_age_seconds: 5.0,
            min_volume_usd_triangular: 5_000.0,
            min_volume_usd_spatial: 10_000.0,
            interval: Duration::from_millis(50),
            triangles: Vec::new(),
            discover_triangles: false,
            exchange_symbols: BTreeMap::new(),
        }
    }
}

impl DetectorConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            min_profit_percentage: config.min_profit_percentage,
            max_age_seconds: config.max_age_seconds,
            min_volume_usd_triangular: config.min_volume_usd.triangular,
            min_volume_usd_spatial: config.min_volume_usd.spatial,
            interval: Duration::from_millis(config.detector.interval_ms),
            triangles: config.parsed_triangles()?,
            discover_triangles: config.discover_triangles,
            exchange_symbols: config
                .exchanges
                .iter()
                .map(|(id, exchange)| (id.clone(), exchange.symbols.clone()))
                .collect(),
        })
    }
}

/// Periodic triangular + spatial scanner. Never mutates the store.
pub struct ArbitrageDetector {
    config: DetectorConfig,
    store: Arc<PriceStore>,
    sink: Arc<dyn OpportunitySink>,
    /// Configured ∪ discovered triangles for exchanges with a symbol list
    triangles_by_exchange: HashMap<String, Vec<Triangle>>,
}

impl ArbitrageDetector {
    pub fn new(config: DetectorConfig, store: Arc<PriceStore>, sink: Arc<dyn OpportunitySink>) -> Self {
        let mut triangles_by_exchange = HashMap::new();
        if config.discover_triangles {
            for (exchange_id, symbols) in &config.exchange_symbols {
                let mut set: BTreeSet<Triangle> = config.triangles.iter().cloned().collect();
                let discovered = discover_triangles(symbols);
                debug!(
                    exchange = %exchange_id,
                    discovered = discovered.len(),
                    "Triangle discovery"
                );
                set.extend(discovered);
                triangles_by_exchange.insert(exchange_id.clone(), set.into_iter().collect());
            }
        }

        Self {
            config,
            store,
            sink,
            triangles_by_exchange,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Triangles scanned on an exchange
    pub fn triangles_for(&self, exchange_id: &str) -> &[Triangle] {
        self.triangles_by_exchange
            .get(exchange_id)
            .map(Vec::as_slice)
            .unwrap_or(&self.config.triangles)
    }

    fn tradeable(&self, exchange_id: &str, symbol: &str, min_volume_usd: f64) -> Option<EnhancedQuote> {
        self.store
            .latest_tradeable(exchange_id, symbol, self.config.max_age_seconds, min_volume_usd)
    }

    // =========================================================================
    // Triangular
    // =========================================================================

    /// Scan every triangle on one exchange.
    ///
    /// Starting from 1 unit of `C`: `final = (1 / ask(A/C)) * ask(B/A) * bid(B/C)`
    /// and `profit = (final - 1) * 100`. Triangles with any stale or missing
    /// leg are skipped.
    pub fn scan_triangular(&self, exchange_id: &str) -> Vec<Opportunity> {
        let min_volume = self.config.min_volume_usd_triangular;
        let mut found = Vec::new();

        for triangle in self.triangles_for(exchange_id) {
            let [first, second, third] = triangle.symbols();
            let (Some(a_c), Some(b_a), Some(b_c)) = (
                self.tradeable(exchange_id, first, min_volume),
                self.tradeable(exchange_id, second, min_volume),
                self.tradeable(exchange_id, third, min_volume),
            ) else {
                continue;
            };

            let final_amount = (1.0 / a_c.ask) * b_a.ask * b_c.bid;
            let profit_percentage = (final_amount - 1.0) * 100.0;
            if profit_percentage <= self.config.min_profit_percentage {
                continue;
            }

            found.push(Opportunity::Triangular {
                exchange: Arc::from(exchange_id),
                path: triangle.path(),
                profit_percentage,
                legs: [
                    TradeLeg {
                        symbol: triangle.first.clone(),
                        side: Side::Buy,
                        price: a_c.ask,
                    },
                    TradeLeg {
                        symbol: triangle.second.clone(),
                        side: Side::Buy,
                        price: b_a.ask,
                    },
                    TradeLeg {
                        symbol: triangle.third.clone(),
                        side: Side::Sell,
                        price: b_c.bid,
                    },
                ],
                timestamp_ms: current_time_ms(),
            });
        }

        found
    }

    // =========================================================================
    // Spatial
    // =========================================================================

    /// Scan one symbol across every pair of exchanges with tradeable quotes.
    ///
    /// Both directions of a pair are evaluated on their own prices, so both
    /// may qualify in the same cycle.
    pub fn scan_spatial(&self, symbol: &str, exchanges: &[String]) -> Vec<Opportunity> {
        let min_volume = self.config.min_volume_usd_spatial;
        let quotes: Vec<(&str, EnhancedQuote)> = exchanges
            .iter()
            .filter_map(|ex| self.tradeable(ex, symbol, min_volume).map(|q| (ex.as_str(), q)))
            .collect();

        let mut found = Vec::new();
        for (i, x) in quotes.iter().enumerate() {
            for y in &quotes[i + 1..] {
                found.extend(self.spatial_direction(symbol, x, y));
                found.extend(self.spatial_direction(symbol, y, x));
            }
        }
        found
    }

    fn spatial_direction(
        &self,
        symbol: &str,
        (buy_exchange, buy): &(&str, EnhancedQuote),
        (sell_exchange, sell): &(&str, EnhancedQuote),
    ) -> Option<Opportunity> {
        let profit_percentage = (sell.bid - buy.ask) / buy.ask * 100.0;
        (profit_percentage > self.config.min_profit_percentage).then(|| Opportunity::Spatial {
            symbol: Arc::from(symbol),
            buy_exchange: Arc::from(*buy_exchange),
            sell_exchange: Arc::from(*sell_exchange),
            buy_price: buy.ask,
            sell_price: sell.bid,
            profit_percentage,
            timestamp_ms: current_time_ms(),
        })
    }

    // =========================================================================
    // Cycle
    // =========================================================================

    /// One full detection pass over the current store contents
    pub fn scan(&self) -> Vec<Opportunity> {
        let exchanges = self.store.exchanges();
        let mut found = Vec::new();

        for exchange_id in &exchanges {
            found.extend(self.scan_triangular(exchange_id));
        }

        let symbols: BTreeSet<String> = exchanges
            .iter()
            .flat_map(|ex| self.store.symbols(ex))
            .collect();
        for symbol in &symbols {
            found.extend(self.scan_spatial(symbol, &exchanges));
        }

        found
    }

    /// Scan once and hand every opportunity to the sink
    pub fn run_cycle(&self) -> usize {
        let found = self.scan();
        for opportunity in &found {
            self.sink.emit(opportunity);
        }
        found.len()
    }

    /// Run cycles at the configured cadence until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            triangles = self.config.triangles.len(),
            discover = self.config.discover_triangles,
            min_profit_pct = self.config.min_profit_percentage,
            "Arbitrage detector started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: u64 = 0;
        let mut reported: u64 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    reported += self.run_cycle() as u64;
                    cycles += 1;
                }
            }
        }

        info!(cycles = cycles, opportunities = reported, "Arbitrage detector stopped");
    }
}
