//! Scoped ownership of an open exchange feed
//!
//! The owner of a `FeedHandle` calls `close()` on every exit path; the
//! supervisor funnels all outcomes of a monitoring attempt through a
//! single close point. The `Drop` impl only warns about handles that
//! escaped without being closed (e.g. a cancelled future); it never closes.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::feeds::errors::FeedResult;
use crate::feeds::traits::{ExchangeFeed, FeedFactory};

/// Owned, close-once wrapper around a boxed feed
pub struct FeedHandle {
    exchange_id: String,
    feed: Box<dyn ExchangeFeed>,
    closed: AtomicBool,
}

impl FeedHandle {
    /// Open a feed through the factory
    pub async fn open(factory: &dyn FeedFactory, exchange_id: &str) -> FeedResult<Self> {
        let feed = factory.open(exchange_id).await?;
        Ok(Self::new(exchange_id, feed))
    }

    pub fn new(exchange_id: &str, feed: Box<dyn ExchangeFeed>) -> Self {
        Self {
            exchange_id: exchange_id.to_string(),
            feed,
            closed: AtomicBool::new(false),
        }
    }

    pub fn feed(&self) -> &dyn ExchangeFeed {
        self.feed.as_ref()
    }

    pub fn exchange_id(&self) -> &str {
        &self.exchange_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the underlying feed once; later calls return `Ok(())`
    pub async fn close(&self) -> FeedResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(exchange = %self.exchange_id, "Closing feed");
        self.feed.close().await
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            warn!(exchange = %self.exchange_id, "Feed handle dropped without being closed");
        }
    }
}
