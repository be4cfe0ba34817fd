//! End-to-end scanner tests
//!
//! Runs the full pipeline (feeds → validation → store → detection → sink)
//! against in-process feeds:
//! 1. A mock streaming feed with adjustable prices (triangular path)
//! 2. The real JSON feed polling a mockito HTTP server (spatial path)
//!
//! # Running the tests
//! ```bash
//! cargo test --test pipeline
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use arb_scanner::config::{load_config_from_str, AppConfig};
use arb_scanner::core::{run_scanner, BroadcastSink, Opportunity, Side};
use arb_scanner::feeds::{
    ExchangeFeed, FeedCapabilities, FeedError, FeedFactory, FeedResult, JsonFeedFactory, RawQuote,
};

// =============================================================================
// Mock Streaming Feed
// =============================================================================

/// Prices shared between the test and every feed the factory opens
#[derive(Default)]
struct MarketBoard {
    quotes: Mutex<HashMap<String, RawQuote>>,
}

impl MarketBoard {
    fn set(&self, symbol: &str, bid: f64, ask: f64) {
        self.quotes
            .lock()
            .insert(symbol.to_string(), RawQuote::from_numbers(bid, ask, 100.0, 100.0));
    }

    fn get(&self, symbol: &str) -> FeedResult<RawQuote> {
        self.quotes
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| FeedError::SubscriptionFailed {
                symbol: symbol.to_string(),
                reason: "unknown symbol".into(),
            })
    }
}

/// Streaming feed that pushes the board's current price every few ms
struct MockStreamingFeed {
    exchange_id: String,
    board: Arc<MarketBoard>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl ExchangeFeed for MockStreamingFeed {
    fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    fn capabilities(&self) -> FeedCapabilities {
        FeedCapabilities {
            streams_ticker: true,
            streams_orderbook: true,
        }
    }

    async fn watch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.board.get(symbol)
    }

    async fn watch_order_book(&self, symbol: &str, _depth: usize) -> FeedResult<RawQuote> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.board.get(symbol)
    }

    async fn fetch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
        self.board.get(symbol)
    }

    async fn close(&self) -> FeedResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockFactory {
    board: Arc<MarketBoard>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedFactory for MockFactory {
    async fn open(&self, exchange_id: &str) -> FeedResult<Box<dyn ExchangeFeed>> {
        Ok(Box::new(MockStreamingFeed {
            exchange_id: exchange_id.to_string(),
            board: Arc::clone(&self.board),
            closes: Arc::clone(&self.closes),
        }))
    }
}

fn triangle_config() -> Arc<AppConfig> {
    let yaml = r#"
exchanges:
  kraken:
    symbols: ["BTC/USDT", "ETH/BTC", "ETH/USDT"]
min_profit_percentage: 0.5
testnet: false
max_age_seconds: 5
min_volume_usd:
  triangular: 5000
  spatial: 10000
detector:
  interval_ms: 5
"#;
    Arc::new(load_config_from_str(yaml).unwrap())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_triangular_opportunity_appears_when_prices_move() {
    let board = Arc::new(MarketBoard::default());
    // (1 / 20000) * 0.06 * 1250 = 0.00375: deeply unprofitable
    board.set("BTC/USDT", 19_990.0, 20_000.0);
    board.set("ETH/BTC", 0.059, 0.06);
    board.set("ETH/USDT", 1_250.0, 1_251.0);

    let closes = Arc::new(AtomicUsize::new(0));
    let factory = Arc::new(MockFactory {
        board: Arc::clone(&board),
        closes: Arc::clone(&closes),
    });
    let sink = Arc::new(BroadcastSink::new(1024));
    let mut rx = sink.subscribe();
    let cancel = CancellationToken::new();

    let run = tokio::spawn(run_scanner(triangle_config(), factory, sink, cancel.clone()));

    // Let several detection cycles pass with no opportunity
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "Unprofitable triangle must not be reported");

    // (1 / 100) * 20 * 5.1 = 1.02 → +2%
    board.set("BTC/USDT", 99.0, 100.0);
    board.set("ETH/BTC", 19.0, 20.0);
    board.set("ETH/USDT", 5.1, 5.2);

    let opportunity = loop {
        let next = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no triangular opportunity")
            .unwrap();
        // Skip cycles that saw a partially updated board
        if (next.profit_percentage() - 2.0).abs() < 1e-6 {
            break next;
        }
    };
    cancel.cancel();
    let summary = run.await.unwrap().unwrap();

    match opportunity {
        Opportunity::Triangular { exchange, path, legs, .. } => {
            assert_eq!(exchange.as_ref(), "kraken");
            assert_eq!(path, ["BTC/USDT", "ETH/BTC", "ETH/USDT"].map(String::from));
            assert_eq!(legs.map(|l| l.side), [Side::Buy, Side::Buy, Side::Sell]);
        }
        other => panic!("Expected triangular, got {:?}", other),
    }
    assert!(summary.abandoned().is_empty());
    assert_eq!(closes.load(Ordering::SeqCst), 1, "Feed closed exactly once");
    assert!(summary.store.len("kraken", "ETH/BTC") <= 100);
}

#[tokio::test]
async fn test_json_feed_polling_drives_spatial_detection() {
    let mut server = mockito::Server::new_async().await;
    let _cheap = server
        .mock("GET", "/cheap/ticker/BTCUSDT")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"bid":"99.0","ask":"100.0","bidVolume":"500","askVolume":"500"}"#)
        .create_async()
        .await;
    let _rich = server
        .mock("GET", "/rich/ticker/BTCUSDT")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"bid":102.0,"ask":103.0,"bid_volume":500,"ask_volume":500}"#)
        .create_async()
        .await;

    let yaml = format!(
        r#"
exchanges:
  cheap:
    symbols: ["BTC/USDT"]
    poll_interval_seconds: 0.01
    endpoints:
      rest_ticker: "{url}/cheap/ticker/{{symbol}}"
  rich:
    symbols: ["BTC/USDT"]
    poll_interval_seconds: 0.01
    endpoints:
      rest_ticker: "{url}/rich/ticker/{{symbol}}"
min_profit_percentage: 0.5
testnet: false
max_age_seconds: 5
min_volume_usd:
  triangular: 5000
  spatial: 10000
detector:
  interval_ms: 5
"#,
        url = server.url()
    );
    let config = Arc::new(load_config_from_str(&yaml).unwrap());
    let factory = Arc::new(JsonFeedFactory::from_config(&config));
    let sink = Arc::new(BroadcastSink::new(1024));
    let mut rx = sink.subscribe();
    let cancel = CancellationToken::new();

    let run = tokio::spawn(run_scanner(config, factory, sink, cancel.clone()));

    let opportunity = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no spatial opportunity")
        .unwrap();
    cancel.cancel();
    let summary = run.await.unwrap().unwrap();

    match opportunity {
        Opportunity::Spatial {
            symbol,
            buy_exchange,
            sell_exchange,
            buy_price,
            sell_price,
            profit_percentage,
            ..
        } => {
            assert_eq!(symbol.as_ref(), "BTC/USDT");
            assert_eq!(buy_exchange.as_ref(), "cheap");
            assert_eq!(sell_exchange.as_ref(), "rich");
            assert_eq!(buy_price, 100.0);
            assert_eq!(sell_price, 102.0);
            assert!((profit_percentage - 2.0).abs() < 1e-9);
        }
        other => panic!("Expected spatial, got {:?}", other),
    }
    assert_eq!(summary.exchanges.len(), 2);
    assert!(summary.abandoned().is_empty());
}

#[tokio::test]
async fn test_testnet_without_sandbox_endpoints_is_abandoned() {
    let yaml = r#"
exchanges:
  kraken:
    symbols: ["BTC/USDT"]
    endpoints:
      rest_ticker: "http://127.0.0.1:9/{symbol}"
min_profit_percentage: 0.5
testnet: true
max_age_seconds: 5
min_volume_usd:
  triangular: 5000
  spatial: 10000
retry:
  max_attempts: 1
  base_delay_secs: 1
  max_delay_secs: 1
"#;
    let config = Arc::new(load_config_from_str(yaml).unwrap());
    let factory = Arc::new(JsonFeedFactory::from_config(&config));
    let cancel = CancellationToken::new();

    let run = tokio::spawn(run_scanner(
        config,
        factory,
        Arc::new(BroadcastSink::new(4)),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let summary = run.await.unwrap().unwrap();

    assert_eq!(summary.abandoned(), vec!["kraken"]);
}
