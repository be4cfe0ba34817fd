//! Exchange feed trait definitions
//!
//! The ExchangeFeed trait is the only view the scanner has of an
//! exchange: capability flags, push-style watches for streaming mode,
//! one-shot fetches for polling mode, and an idempotent close.

use async_trait::async_trait;

use crate::feeds::errors::FeedResult;
use crate::feeds::types::{FeedCapabilities, RawQuote};

/// Market-data capability of one exchange connection
///
/// All methods take `&self` so the supervisor can keep many watches in
/// flight on the same connection; implementations use interior
/// mutability for their sockets.
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
///
/// struct RestOnlyFeed { http: reqwest::Client, url: String }
///
/// #[async_trait]
/// impl ExchangeFeed for RestOnlyFeed {
///     fn exchange_id(&self) -> &str { "kraken" }
///     fn capabilities(&self) -> FeedCapabilities { FeedCapabilities::default() }
///     async fn fetch_ticker(&self, symbol: &str) -> FeedResult<RawQuote> {
///         // GET the ticker and deserialize into RawQuote
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait ExchangeFeed: Send + Sync {
    /// Exchange identifier (e.g. "kraken", "bitfinex")
    fn exchange_id(&self) -> &str;

    /// Which push channels this connection can serve
    fn capabilities(&self) -> FeedCapabilities;

    /// Suspend until the next ticker push for `symbol` (streaming mode only)
    async fn watch_ticker(&self, symbol: &str) -> FeedResult<RawQuote>;

    /// Suspend until the next order-book push for `symbol`, reduced to a
    /// quote-compatible top of book (streaming mode only)
    async fn watch_order_book(&self, symbol: &str, depth: usize) -> FeedResult<RawQuote>;

    /// One-shot ticker snapshot (polling mode)
    async fn fetch_ticker(&self, symbol: &str) -> FeedResult<RawQuote>;

    /// Release the connection. A second call must be a no-op.
    async fn close(&self) -> FeedResult<()>;
}

/// Opens a fresh feed connection for an exchange
///
/// The supervisor calls this once per monitoring attempt, so a factory
/// must be able to produce any number of independent connections.
#[async_trait]
pub trait FeedFactory: Send + Sync {
    async fn open(&self, exchange_id: &str) -> FeedResult<Box<dyn ExchangeFeed>>;
}
