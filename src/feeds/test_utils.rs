//! Shared test utilities for feed consumers
//!
//! Provides a scriptable `ScriptedFeed` and `ScriptedFactory` so the
//! supervisor, handle and runtime tests can drive every feed path
//! (streaming, polling, per-item errors, stream failures, open failures)
//! without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::feeds::errors::{FeedError, FeedResult};
use crate::feeds::traits::{ExchangeFeed, FeedFactory};
use crate::feeds::types::{FeedCapabilities, RawQuote};

/// Call counters shared between a feed and the test that owns it
#[derive(Debug, Default)]
pub struct FeedProbe {
    close_calls: AtomicUsize,
    watch_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl FeedProbe {
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Symbols passed to `fetch_ticker`, in call order
    pub fn fetched_symbols(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

type Script = Mutex<HashMap<String, VecDeque<FeedResult<RawQuote>>>>;

/// Feed whose every answer is queued up front by the test
pub struct ScriptedFeed {
    exchange_id: String,
    capabilities: FeedCapabilities,
    tickers: Script,
    books: Script,
    fetches: Script,
    /// Per-symbol latency applied to every watch
    watch_delays: HashMap<String, Duration>,
    /// Returned by `fetch_ticker` once the symbol's script is exhausted
    fallback_fetch: Option<RawQuote>,
    probe: Arc<FeedProbe>,
}

impl ScriptedFeed {
    /// Polling-only feed with empty scripts
    pub fn new(exchange_id: &str) -> Self {
        Self {
            exchange_id: exchange_id.to_string(),
            capabilities: FeedCapabilities::default(),
            tickers: Mutex::new(HashMap::new()),
            books: Mutex::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
            watch_delays: HashMap::new(),
            fallback_fetch: None,
            probe: Arc::new(FeedProbe::default()),
        }
    }

    /// Advertise both streaming channels
    pub fn with_streaming(mut self) -> Self {
        self.capabilities = FeedCapabilities {
            streams_ticker: true,
            streams_orderbook: true,
        };
        self
    }

    pub fn with_capabilities(mut self, capabilities: FeedCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn push_ticker(self, symbol: &str, result: FeedResult<RawQuote>) -> Self {
        push(&self.tickers, symbol, result);
        self
    }

    pub fn push_book(self, symbol: &str, result: FeedResult<RawQuote>) -> Self {
        push(&self.books, symbol, result);
        self
    }

    pub fn push_fetch(self, symbol: &str, result: FeedResult<RawQuote>) -> Self {
        push(&self.fetches, symbol, result);
        self
    }

    pub fn with_watch_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.watch_delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_fallback_fetch(mut self, quote: RawQuote) -> Self {
        self.fallback_fetch = Some(quote);
        self
    }

    pub fn probe(&self) -> Arc<FeedProbe> {
        Arc::clone(&self.probe)
    }

    async fn watch_latency(&self, symbol: &str) {
        match self.watch_delays.get(symbol) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => tokio::task::yield_now().await,
        }
    }
}

fn push(script: &Script, symbol: &str, result: FeedResult<RawQuote>) {
    script
        .lock()
        .entry(symbol.to_string())
        .or_default()
        .push_back(result);
}

fn pop(script: &Script, symbol: &str) -> Option<FeedResult<RawQuote>> {
    script.lock().get_mut(symbol).and_then(|q| q.pop_front())
}

#[async_trait]
impl ExchangeFeed for ScriptedFeed {
    fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    fn capabilities(&self) -> FeedCapabilities {
        self.capabilities
    }

    async fn watch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
        self.probe.watch_calls.fetch_add(1, Ordering::SeqCst);
        self.watch_latency(symbol).await;
        pop(&self.tickers, symbol)
            .unwrap_or_else(|| Err(FeedError::ConnectionFailed("ticker stream ended".into())))
    }

    async fn watch_order_book(&self, symbol: &str, _depth: usize) -> FeedResult<RawQuote> {
        self.probe.watch_calls.fetch_add(1, Ordering::SeqCst);
        self.watch_latency(symbol).await;
        pop(&self.books, symbol)
            .unwrap_or_else(|| Err(FeedError::ConnectionFailed("book stream ended".into())))
    }

    async fn fetch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
        self.probe.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.fetched.lock().push(symbol.to_string());
        tokio::task::yield_now().await;
        match pop(&self.fetches, symbol) {
            Some(result) => result,
            None => self
                .fallback_fetch
                .clone()
                .ok_or_else(|| FeedError::InvalidResponse(format!("no ticker for {}", symbol))),
        }
    }

    async fn close(&self) -> FeedResult<()> {
        self.probe.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type Builder = Box<dyn Fn(&str) -> FeedResult<ScriptedFeed> + Send + Sync>;

/// Factory that builds a new `ScriptedFeed` on every open
pub struct ScriptedFactory {
    builder: Builder,
    attempts: AtomicUsize,
    probes: Mutex<Vec<Arc<FeedProbe>>>,
}

impl ScriptedFactory {
    pub fn new<F>(builder: F) -> Self
    where
        F: Fn(&str) -> FeedResult<ScriptedFeed> + Send + Sync + 'static,
    {
        Self {
            builder: Box::new(builder),
            attempts: AtomicUsize::new(0),
            probes: Mutex::new(Vec::new()),
        }
    }

    /// Number of `open` calls, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of feeds successfully opened
    pub fn opened(&self) -> usize {
        self.probes.lock().len()
    }

    /// Total `close` calls across every feed this factory produced
    pub fn closed(&self) -> usize {
        self.probes.lock().iter().map(|p| p.close_calls()).sum()
    }

    pub fn probes(&self) -> Vec<Arc<FeedProbe>> {
        self.probes.lock().clone()
    }
}

#[async_trait]
impl FeedFactory for ScriptedFactory {
    async fn open(&self, exchange_id: &str) -> FeedResult<Box<dyn ExchangeFeed>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let feed = (self.builder)(exchange_id)?;
        self.probes.lock().push(feed.probe());
        Ok(Box::new(feed))
    }
}
