//! Wire-level data types shared by every exchange feed
//!
//! A `RawQuote` is exactly what an exchange reported: every field may be
//! missing, null, a JSON number or a numeric string. Nothing here is
//! validated; that is the job of `core::validator`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Raw Quote
// =============================================================================

/// Exchange-reported best bid/ask snapshot, transient and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    #[serde(default)]
    pub bid: Option<Value>,
    #[serde(default)]
    pub ask: Option<Value>,
    #[serde(default, alias = "bid_volume", alias = "bidQty", alias = "bid_qty")]
    #[serde(rename = "bidVolume")]
    pub bid_volume: Option<Value>,
    #[serde(default, alias = "ask_volume", alias = "askQty", alias = "ask_qty")]
    #[serde(rename = "askVolume")]
    pub ask_volume: Option<Value>,
}

impl RawQuote {
    /// Build a quote from plain numbers (test and adapter convenience)
    pub fn from_numbers(bid: f64, ask: f64, bid_volume: f64, ask_volume: f64) -> Self {
        Self {
            bid: Some(Value::from(bid)),
            ask: Some(Value::from(ask)),
            bid_volume: Some(Value::from(bid_volume)),
            ask_volume: Some(Value::from(ask_volume)),
        }
    }

    /// True when the exchange sent nothing usable at all
    pub fn is_empty(&self) -> bool {
        self.bid.is_none()
            && self.ask.is_none()
            && self.bid_volume.is_none()
            && self.ask_volume.is_none()
    }
}

// =============================================================================
// Order Book Snapshot
// =============================================================================

/// Pushed order-book frame: `[[price, qty], ...]` per side, best level first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookSnapshot {
    #[serde(default)]
    pub bids: Vec<Vec<Value>>,
    #[serde(default)]
    pub asks: Vec<Vec<Value>>,
}

impl BookSnapshot {
    /// Reduce the snapshot to its top of book.
    ///
    /// Missing levels become missing fields, so an empty side is rejected
    /// downstream like any other incomplete quote.
    pub fn top_of_book(&self) -> RawQuote {
        let level = |side: &[Vec<Value>], idx: usize| -> Option<Value> {
            side.first().and_then(|lvl| lvl.get(idx)).cloned()
        };
        RawQuote {
            bid: level(&self.bids, 0),
            ask: level(&self.asks, 0),
            bid_volume: level(&self.bids, 1),
            ask_volume: level(&self.asks, 1),
        }
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// What push channels a feed can serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedCapabilities {
    pub streams_ticker: bool,
    pub streams_orderbook: bool,
}

impl FeedCapabilities {
    /// Streaming is only used when BOTH ticker and order-book pushes exist
    pub fn supports_streaming(&self) -> bool {
        self.streams_ticker && self.streams_orderbook
    }
}
