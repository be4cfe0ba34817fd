//! Per-exchange feed supervisor
//!
//! State machine: `Connecting → Streaming | Polling → Failed`.
//!
//! Each monitoring attempt opens a fresh feed, streams when the feed can
//! push both tickers and order books (falling back to REST polling once
//! on a stream-level failure), and always closes the feed before the
//! attempt ends. A failed attempt is retried after
//! `min(max_delay, base_delay * 2^attempt)`; once `max_attempts` attempts
//! have failed the exchange is abandoned. Other exchanges are unaffected.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{constants, AppConfig, RetrySettings};
use crate::core::store::PriceStore;
use crate::core::types::current_time_ms;
use crate::core::validator::validate;
use crate::feeds::{ExchangeFeed, FeedError, FeedErrorCategory, FeedFactory, FeedHandle, FeedResult, RawQuote};

/// One resolved watch: symbol, result, arrival time in ms
type Update<'a> = (&'a str, FeedResult<RawQuote>, u64);

// =============================================================================
// State & Outcome
// =============================================================================

/// Observable supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Connecting,
    Streaming,
    Polling,
    /// Terminal: retries exhausted
    Failed,
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedState::Connecting => write!(f, "connecting"),
            FeedState::Streaming => write!(f, "streaming"),
            FeedState::Polling => write!(f, "polling"),
            FeedState::Failed => write!(f, "failed"),
        }
    }
}

/// Why a supervisor returned
#[derive(Debug)]
pub enum SupervisorOutcome {
    /// Cancellation requested
    Stopped,
    /// Every allowed attempt failed; the exchange is no longer monitored
    Abandoned { attempts: u32, last_error: FeedError },
}

/// Final report of one supervisor run
#[derive(Debug)]
pub struct SupervisorReport {
    pub exchange_id: String,
    pub outcome: SupervisorOutcome,
    /// Failed monitoring attempts
    pub failed_attempts: u32,
    /// Backoff waits performed, in order
    pub waits: Vec<Duration>,
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Exponential backoff without jitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_secs(settings.base_delay_secs),
            max_delay: Duration::from_secs(settings.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Wait after the failure of zero-based `attempt`:
    /// `min(max_delay, base_delay * 2^attempt)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// Settings for one exchange's supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub exchange_id: String,
    pub symbols: Vec<String>,
    /// Delay after each REST request in polling mode
    pub poll_interval: Duration,
    pub order_book_depth: usize,
    /// Delay between two streaming cycles
    pub stream_pause: Duration,
    pub retry: RetryPolicy,
}

impl SupervisorConfig {
    /// Build from the application config; `None` for an unknown exchange
    pub fn from_app_config(config: &AppConfig, exchange_id: &str) -> Option<Self> {
        let exchange = config.exchanges.get(exchange_id)?;
        Some(Self {
            exchange_id: exchange_id.to_string(),
            symbols: exchange.symbols.clone(),
            poll_interval: exchange.poll_interval(),
            order_book_depth: constants::order_book_depth(),
            stream_pause: constants::stream_pause(),
            retry: RetryPolicy::from(&config.retry),
        })
    }
}

/// Keeps one exchange's quotes flowing into the store
pub struct FeedSupervisor {
    config: SupervisorConfig,
    factory: Arc<dyn FeedFactory>,
    store: Arc<PriceStore>,
    state: watch::Sender<FeedState>,
}

impl FeedSupervisor {
    pub fn new(config: SupervisorConfig, factory: Arc<dyn FeedFactory>, store: Arc<PriceStore>) -> Self {
        let (state, _rx) = watch::channel(FeedState::Connecting);
        Self {
            config,
            factory,
            store,
            state,
        }
    }

    pub fn exchange_id(&self) -> &str {
        &self.config.exchange_id
    }

    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: FeedState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(exchange = %self.config.exchange_id, from = %previous, to = %next, "Feed state change");
        }
    }

    /// Monitor until cancelled or abandoned
    pub async fn run(&self, cancel: CancellationToken) -> SupervisorReport {
        let exchange = self.config.exchange_id.clone();
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut waits = Vec::new();
        let mut failed: u32 = 0;

        let outcome = loop {
            if cancel.is_cancelled() {
                break SupervisorOutcome::Stopped;
            }

            let err = match self.monitor_once(&cancel).await {
                Ok(()) => break SupervisorOutcome::Stopped,
                Err(e) => e,
            };

            self.log_failure(&err);
            failed += 1;

            if failed >= max_attempts {
                self.set_state(FeedState::Failed);
                error!(
                    exchange = %exchange,
                    attempts = failed,
                    error = %err,
                    "Exchange failed permanently, giving up"
                );
                break SupervisorOutcome::Abandoned {
                    attempts: failed,
                    last_error: err,
                };
            }

            let wait = self.config.retry.delay_for(failed - 1);
            warn!(
                exchange = %exchange,
                attempt = failed,
                max_attempts = max_attempts,
                retry_in_ms = wait.as_millis() as u64,
                "Monitoring attempt failed, retrying"
            );
            waits.push(wait);

            tokio::select! {
                _ = cancel.cancelled() => break SupervisorOutcome::Stopped,
                _ = tokio::time::sleep(wait) => {}
            }
        };

        info!(exchange = %exchange, outcome = ?outcome, "Supervisor finished");
        SupervisorReport {
            exchange_id: exchange,
            outcome,
            failed_attempts: failed,
            waits,
        }
    }

    /// One monitoring attempt: open, drive, always close
    async fn monitor_once(&self, cancel: &CancellationToken) -> FeedResult<()> {
        let exchange = &self.config.exchange_id;
        self.set_state(FeedState::Connecting);
        info!(exchange = %exchange, "Initializing feed connection");

        let handle = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            opened = FeedHandle::open(self.factory.as_ref(), exchange) => opened?,
        };
        info!(exchange = %exchange, "Feed connected");

        let result = self.drive(handle.feed(), cancel).await;

        if let Err(e) = handle.close().await {
            warn!(exchange = %exchange, error = %e, "Error closing feed");
        }
        result
    }

    async fn drive(&self, feed: &dyn ExchangeFeed, cancel: &CancellationToken) -> FeedResult<()> {
        let exchange = &self.config.exchange_id;
        if self.config.symbols.is_empty() {
            return Err(FeedError::Unsupported(format!("{} has no symbols to monitor", exchange)));
        }

        if feed.capabilities().supports_streaming() {
            self.set_state(FeedState::Streaming);
            info!(exchange = %exchange, symbols = self.config.symbols.len(), "Streaming tickers and order books");
            match self.stream(feed, cancel).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    error!(exchange = %exchange, category = %e.category(), error = %e, "WebSocket stream failed");
                    info!(exchange = %exchange, "Falling back to REST polling");
                }
            }
        } else {
            info!(
                exchange = %exchange,
                "WebSocket incomplete (need ticker and order book), using REST polling"
            );
        }

        self.set_state(FeedState::Polling);
        self.poll(feed, cancel).await
    }

    fn ingest(&self, symbol: &str, raw: &RawQuote, received_at_ms: u64) {
        if let Ok(quote) = validate(Some(raw), &self.config.exchange_id, symbol) {
            self.store.record_at(&self.config.exchange_id, symbol, quote, received_at_ms);
        }
    }

    /// Streaming rounds until cancelled or a stream-level failure.
    ///
    /// Every update is stored as soon as its watch resolves, stamped with
    /// the time it arrived. A stream failure ends streaming once the round
    /// has drained.
    async fn stream(&self, feed: &dyn ExchangeFeed, cancel: &CancellationToken) -> FeedResult<()> {
        let exchange = &self.config.exchange_id;
        let depth = self.config.order_book_depth;

        loop {
            let mut watches: FuturesUnordered<BoxFuture<'_, Update<'_>>> = FuturesUnordered::new();
            for symbol in &self.config.symbols {
                let symbol = symbol.as_str();
                watches.push(
                    async move {
                        let result = feed.watch_ticker(symbol).await;
                        (symbol, result, current_time_ms())
                    }
                    .boxed(),
                );
                watches.push(
                    async move {
                        let result = feed.watch_order_book(symbol, depth).await;
                        (symbol, result, current_time_ms())
                    }
                    .boxed(),
                );
            }

            let mut failure = None;
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    next = watches.next() => next,
                };
                let Some((symbol, result, received_at_ms)) = next else {
                    break;
                };
                match result {
                    Ok(raw) => self.ingest(symbol, &raw, received_at_ms),
                    Err(e) if e.is_stream_failure() => {
                        failure.get_or_insert(e);
                    }
                    Err(e) => {
                        error!(exchange = %exchange, symbol = %symbol, error = %e, "WebSocket update error");
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.stream_pause) => {}
            }
        }
    }

    /// Sequential REST passes until cancelled or a fatal feed error
    async fn poll(&self, feed: &dyn ExchangeFeed, cancel: &CancellationToken) -> FeedResult<()> {
        let exchange = &self.config.exchange_id;
        info!(
            exchange = %exchange,
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Using REST polling"
        );

        loop {
            for symbol in &self.config.symbols {
                let result = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    result = feed.fetch_ticker(symbol) => result,
                };
                match result {
                    Ok(raw) => self.ingest(symbol, &raw, current_time_ms()),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        error!(exchange = %exchange, symbol = %symbol, error = %e, "REST error fetching ticker");
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
    }

    fn log_failure(&self, err: &FeedError) {
        let exchange = &self.config.exchange_id;
        let category = err.category();
        match category {
            FeedErrorCategory::Dns => {
                error!(exchange = %exchange, category = %category, error = %err, "DNS resolution failed");
                info!(exchange = %exchange, "Usually a temporary network issue, will retry");
            }
            FeedErrorCategory::Tls => {
                error!(exchange = %exchange, category = %category, error = %err, "TLS/certificate error");
            }
            FeedErrorCategory::Timeout => {
                error!(exchange = %exchange, category = %category, error = %err, "Connection timeout");
            }
            _ => {
                error!(exchange = %exchange, category = %category, error = %err, "Feed monitoring failed");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
