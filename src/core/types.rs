//! Core data types for the price store and arbitrage detection pipeline.
//!
//! Validated quotes are the only thing the store holds; opportunities are
//! report records handed to a sink and never stored.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Enhanced Quote (validated, one exchange + symbol)
// =============================================================================

/// Quote that passed validation, with derived spread and liquidity score.
///
/// Invariants: all four inputs are positive and finite, `ask >= bid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedQuote {
    /// Best bid price
    pub bid: f64,
    /// Best ask price
    pub ask: f64,
    /// Base-asset volume at the bid
    pub bid_volume: f64,
    /// Base-asset volume at the ask
    pub ask_volume: f64,
    /// (ask - bid) / bid * 100
    pub spread_pct: f64,
    /// Liquidity score in [0, 100]
    pub volume_score: f64,
    /// Validation time in milliseconds (epoch)
    pub observed_at_ms: u64,
}

impl EnhancedQuote {
    /// Smaller USD notional of the two sides of the book
    #[inline]
    pub fn liquidity_usd(&self) -> f64 {
        (self.bid * self.bid_volume).min(self.ask * self.ask_volume)
    }
}

// =============================================================================
// Arbitrage Opportunity
// =============================================================================

/// Direction of one executed leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// One leg of a triangular cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLeg {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
}

/// Detected opportunity, emitted once per detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Opportunity {
    /// Three-pair cycle on a single exchange
    Triangular {
        exchange: Arc<str>,
        /// `[A/C, B/A, B/C]`
        path: [String; 3],
        profit_percentage: f64,
        legs: [TradeLeg; 3],
        timestamp_ms: u64,
    },
    /// Same symbol bought on one exchange and sold on another
    Spatial {
        symbol: Arc<str>,
        buy_exchange: Arc<str>,
        sell_exchange: Arc<str>,
        /// Ask on the buy exchange
        buy_price: f64,
        /// Bid on the sell exchange
        sell_price: f64,
        profit_percentage: f64,
        timestamp_ms: u64,
    },
}

impl Opportunity {
    pub fn profit_percentage(&self) -> f64 {
        match self {
            Opportunity::Triangular {
                profit_percentage, ..
            }
            | Opportunity::Spatial {
                profit_percentage, ..
            } => *profit_percentage,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Opportunity::Triangular { .. } => "triangular",
            Opportunity::Spatial { .. } => "spatial",
        }
    }
}

// =============================================================================
// Utility
// =============================================================================

/// Get current time in milliseconds since epoch.
#[inline]
pub fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
