//! Bounded per-(exchange, symbol) price history
//!
//! Each key owns a fixed-capacity ring buffer of `(timestamp_ms, quote)`
//! behind its own lock, so writers on different keys never contend and a
//! reader on a key sees the buffer either before or after an append.
//! Buffers are created on first write and live for the process lifetime.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::constants::PRICE_HISTORY_CAPACITY;
use crate::core::types::{current_time_ms, EnhancedQuote};

type Series = Arc<RwLock<VecDeque<(u64, EnhancedQuote)>>>;

/// Shared quote store written by feed supervisors and read by the detector
pub struct PriceStore {
    books: RwLock<HashMap<Arc<str>, HashMap<Arc<str>, Series>>>,
    capacity: usize,
    enforce_liquidity_gate: bool,
}

impl PriceStore {
    /// Store with the default capacity (100 entries per key)
    pub fn new(enforce_liquidity_gate: bool) -> Self {
        Self::with_capacity(PRICE_HISTORY_CAPACITY, enforce_liquidity_gate)
    }

    pub fn with_capacity(capacity: usize, enforce_liquidity_gate: bool) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            enforce_liquidity_gate,
        }
    }

    pub fn liquidity_gate_enabled(&self) -> bool {
        self.enforce_liquidity_gate
    }

    fn series(&self, exchange_id: &str, symbol: &str) -> Option<Series> {
        self.books
            .read()
            .get(exchange_id)
            .and_then(|symbols| symbols.get(symbol))
            .map(Arc::clone)
    }

    fn series_or_create(&self, exchange_id: &str, symbol: &str) -> Series {
        if let Some(series) = self.series(exchange_id, symbol) {
            return series;
        }
        let mut books = self.books.write();
        let symbols = books.entry(Arc::from(exchange_id)).or_default();
        Arc::clone(symbols.entry(Arc::from(symbol)).or_insert_with(|| {
            Arc::new(RwLock::new(VecDeque::with_capacity(self.capacity)))
        }))
    }

    /// Append `quote` stamped with the current time
    pub fn record(&self, exchange_id: &str, symbol: &str, quote: EnhancedQuote) {
        self.record_at(exchange_id, symbol, quote, current_time_ms());
    }

    /// Append `quote` stamped with `timestamp_ms`, evicting the oldest
    /// entry once the buffer is full
    pub fn record_at(&self, exchange_id: &str, symbol: &str, quote: EnhancedQuote, timestamp_ms: u64) {
        let series = self.series_or_create(exchange_id, symbol);
        let mut buffer = series.write();
        buffer.push_back((timestamp_ms, quote));
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
    }

    /// Newest quote for the key if it is fresh enough to trade on.
    ///
    /// Only the newest entry is considered. `min_volume_usd` is enforced
    /// only when the store was built with the liquidity gate enabled;
    /// otherwise the shortfall is reported at debug level and the quote
    /// still passes.
    pub fn latest_tradeable(
        &self,
        exchange_id: &str,
        symbol: &str,
        max_age_seconds: f64,
        min_volume_usd: f64,
    ) -> Option<EnhancedQuote> {
        self.latest_tradeable_at(exchange_id, symbol, max_age_seconds, min_volume_usd, current_time_ms())
    }

    /// `latest_tradeable` evaluated at `now_ms`
    pub fn latest_tradeable_at(
        &self,
        exchange_id: &str,
        symbol: &str,
        max_age_seconds: f64,
        min_volume_usd: f64,
        now_ms: u64,
    ) -> Option<EnhancedQuote> {
        let series = self.series(exchange_id, symbol)?;
        let (timestamp_ms, quote) = series.read().back().cloned()?;

        let age_seconds = now_ms.saturating_sub(timestamp_ms) as f64 / 1000.0;
        if age_seconds > max_age_seconds {
            return None;
        }

        let liquidity = quote.liquidity_usd();
        if liquidity < min_volume_usd {
            if self.enforce_liquidity_gate {
                return None;
            }
            debug!(
                exchange = %exchange_id,
                symbol = %symbol,
                liquidity_usd = liquidity,
                min_volume_usd = min_volume_usd,
                "Quote below liquidity threshold (gate disabled)"
            );
        }

        Some(quote)
    }

    /// Exchanges with at least one recorded quote, sorted
    pub fn exchanges(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.books.read().keys().map(|k| k.to_string()).collect();
        ids.sort();
        ids
    }

    /// Symbols recorded for an exchange, sorted
    pub fn symbols(&self, exchange_id: &str) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .books
            .read()
            .get(exchange_id)
            .map(|s| s.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default();
        symbols.sort();
        symbols
    }

    /// Copy of the buffer for a key, oldest first
    pub fn history(&self, exchange_id: &str, symbol: &str) -> Vec<(u64, EnhancedQuote)> {
        self.series(exchange_id, symbol)
            .map(|s| s.read().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, exchange_id: &str, symbol: &str) -> usize {
        self.series(exchange_id, symbol)
            .map(|s| s.read().len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }
}
