//! Generic JSON exchange feed
//!
//! `JsonFeed` talks to any exchange whose REST ticker and WebSocket pushes
//! can be described by URL templates and JSON bodies with `bid`/`ask`
//! (ticker) or `bids`/`asks` (order book) fields. Endpoints come from the
//! `exchanges.<id>.endpoints` section of the configuration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::{constants, AppConfig, EndpointSet, ExchangeEndpoints};
use crate::core::triangle::split_symbol;
use crate::feeds::errors::{FeedError, FeedResult};
use crate::feeds::traits::{ExchangeFeed, FeedFactory};
use crate::feeds::types::{BookSnapshot, FeedCapabilities, RawQuote};
use crate::feeds::websocket::{connect_tls, TlsWebSocketStream};

type SharedStream = Arc<Mutex<TlsWebSocketStream>>;

// =============================================================================
// Template Rendering
// =============================================================================

/// Expand `{symbol}`, `{symbol_lower}`, `{base}`, `{quote}` and `{depth}`.
///
/// `{symbol}` is the unified symbol with its slash removed (`BTC/USDT` →
/// `BTCUSDT`).
pub fn render_template(template: &str, symbol: &str, depth: usize) -> String {
    let (base, quote) = split_symbol(symbol).unwrap_or((symbol, ""));
    let compact = symbol.replace('/', "");
    template
        .replace("{symbol_lower}", &compact.to_lowercase())
        .replace("{symbol}", &compact)
        .replace("{base}", base)
        .replace("{quote}", quote)
        .replace("{depth}", &depth.to_string())
}

/// Map a reqwest failure onto the feed error taxonomy
fn map_http(err: reqwest::Error, timeout_ms: u64) -> FeedError {
    if err.is_timeout() {
        FeedError::Timeout(timeout_ms)
    } else if err.is_connect() {
        FeedError::ConnectionFailed(err.to_string())
    } else if err.is_decode() {
        FeedError::InvalidResponse(err.to_string())
    } else {
        FeedError::Http(err.to_string())
    }
}

// =============================================================================
// JsonFeed
// =============================================================================

/// Config-driven feed: REST polling plus optional WebSocket pushes
pub struct JsonFeed {
    exchange_id: String,
    endpoints: EndpointSet,
    http: reqwest::Client,
    http_timeout_ms: u64,
    /// One socket per rendered URL, opened on first watch
    streams: Mutex<HashMap<String, SharedStream>>,
    closed: AtomicBool,
}

impl JsonFeed {
    pub fn new(
        exchange_id: &str,
        endpoints: EndpointSet,
        http: reqwest::Client,
        http_timeout: Duration,
    ) -> Self {
        Self {
            exchange_id: exchange_id.to_string(),
            endpoints,
            http,
            http_timeout_ms: http_timeout.as_millis() as u64,
            streams: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> FeedResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(FeedError::Closed)
        } else {
            Ok(())
        }
    }

    fn endpoint<'a>(&self, template: &'a Option<String>, kind: &str) -> FeedResult<&'a str> {
        template.as_deref().ok_or_else(|| {
            FeedError::Unsupported(format!("{} has no {} endpoint", self.exchange_id, kind))
        })
    }

    /// Pooled socket for `url`, connecting on first use.
    ///
    /// The handshake runs outside the pool lock and is bounded by the
    /// HTTP timeout.
    async fn stream_for(&self, url: &str) -> FeedResult<SharedStream> {
        if let Some(stream) = self.streams.lock().await.get(url) {
            return Ok(Arc::clone(stream));
        }

        let timeout = Duration::from_millis(self.http_timeout_ms);
        let ws = tokio::time::timeout(timeout, connect_tls(url))
            .await
            .map_err(|_| FeedError::Timeout(self.http_timeout_ms))??;
        debug!(exchange = %self.exchange_id, url = %url, "WebSocket stream opened");

        let mut streams = self.streams.lock().await;
        let stream = streams
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ws)));
        Ok(Arc::clone(stream))
    }

    async fn forget(&self, url: &str) {
        self.streams.lock().await.remove(url);
    }

    /// Await the next text payload on the socket behind `url`.
    ///
    /// A closed or broken socket is dropped from the pool so the next
    /// monitoring attempt reconnects from scratch.
    async fn next_frame(&self, url: &str) -> FeedResult<String> {
        self.ensure_open()?;
        let stream = self.stream_for(url).await?;
        let mut ws = stream.lock().await;
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes)
                        .map_err(|e| FeedError::InvalidResponse(format!("non UTF-8 frame: {}", e)));
                }
                Some(Ok(Message::Close(_))) | None => {
                    drop(ws);
                    self.forget(url).await;
                    return Err(FeedError::ConnectionFailed(format!(
                        "{} stream closed by server",
                        self.exchange_id
                    )));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    drop(ws);
                    self.forget(url).await;
                    return Err(FeedError::from(e));
                }
            }
        }
    }
}

#[async_trait]
impl ExchangeFeed for JsonFeed {
    fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    fn capabilities(&self) -> FeedCapabilities {
        FeedCapabilities {
            streams_ticker: self.endpoints.ws_ticker.is_some(),
            streams_orderbook: self.endpoints.ws_order_book.is_some(),
        }
    }

    async fn watch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
        let template = self.endpoint(&self.endpoints.ws_ticker, "ticker stream")?;
        let url = render_template(template, symbol, 0);
        let frame = self.next_frame(&url).await?;
        serde_json::from_str(&frame).map_err(|e| FeedError::InvalidResponse(e.to_string()))
    }

    async fn watch_order_book(&self, symbol: &str, depth: usize) -> FeedResult<RawQuote> {
        let template = self.endpoint(&self.endpoints.ws_order_book, "order book stream")?;
        let url = render_template(template, symbol, depth);
        let frame = self.next_frame(&url).await?;
        let book: BookSnapshot =
            serde_json::from_str(&frame).map_err(|e| FeedError::InvalidResponse(e.to_string()))?;
        Ok(book.top_of_book())
    }

    async fn fetch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
        self.ensure_open()?;
        let template = self.endpoint(&self.endpoints.rest_ticker, "REST ticker")?;
        let url = render_template(template, symbol, 0);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| map_http(e, self.http_timeout_ms))?
            .error_for_status()
            .map_err(|e| map_http(e, self.http_timeout_ms))?;

        response
            .json::<RawQuote>()
            .await
            .map_err(|e| map_http(e, self.http_timeout_ms))
    }

    async fn close(&self) -> FeedResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let streams: Vec<(String, SharedStream)> = self.streams.lock().await.drain().collect();
        let mut last_error = None;
        for (url, stream) in streams {
            let mut ws = stream.lock().await;
            if let Err(e) = ws.close(None).await {
                debug!(exchange = %self.exchange_id, url = %url, error = %e, "WebSocket close failed");
                last_error = Some(FeedError::from(e));
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// =============================================================================
// JsonFeedFactory
// =============================================================================

/// Builds a fresh `JsonFeed` per monitoring attempt
pub struct JsonFeedFactory {
    endpoints: HashMap<String, ExchangeEndpoints>,
    testnet: bool,
    http: reqwest::Client,
    http_timeout: Duration,
}

impl JsonFeedFactory {
    pub fn new(
        endpoints: HashMap<String, ExchangeEndpoints>,
        testnet: bool,
        http_timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .connect_timeout(http_timeout)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "HTTP client builder failed, using defaults without timeouts");
                reqwest::Client::new()
            });

        Self {
            endpoints,
            testnet,
            http,
            http_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let endpoints = config
            .exchanges
            .iter()
            .map(|(id, exchange)| (id.clone(), exchange.endpoints.clone()))
            .collect();
        let factory = Self::new(endpoints, config.testnet, constants::http_timeout());
        info!(
            exchanges = factory.endpoints.len(),
            testnet = factory.testnet,
            http_timeout_ms = factory.http_timeout.as_millis() as u64,
            "JSON feed factory configured"
        );
        factory
    }
}

#[async_trait]
impl FeedFactory for JsonFeedFactory {
    async fn open(&self, exchange_id: &str) -> FeedResult<Box<dyn ExchangeFeed>> {
        let endpoints = self.endpoints.get(exchange_id).ok_or_else(|| {
            FeedError::Unsupported(format!("exchange '{}' is not configured", exchange_id))
        })?;

        let set = endpoints.resolve(self.testnet).ok_or_else(|| {
            FeedError::Unsupported(format!("{} has no testnet endpoints", exchange_id))
        })?;

        if set.is_empty() {
            return Err(FeedError::Unsupported(format!(
                "{} has no endpoints configured",
                exchange_id
            )));
        }

        let feed = JsonFeed::new(exchange_id, set.clone(), self.http.clone(), self.http_timeout);
        if !feed.capabilities().supports_streaming() && set.rest_ticker.is_none() {
            warn!(
                exchange = %exchange_id,
                "Partial WebSocket endpoints and no REST ticker: polling is impossible"
            );
            return Err(FeedError::Unsupported(format!(
                "{} needs a REST ticker or both WebSocket endpoints",
                exchange_id
            )));
        }

        Ok(Box::new(feed))
    }
}

// =============================================================================
// Tests
// =============================================================================
