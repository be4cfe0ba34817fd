//! Exchange feeds
//!
//! This module provides the abstractions the scanner uses to pull quotes
//! from exchanges, plus a generic config-driven JSON implementation.
//!
//! Prefer importing from `crate::feeds`:
//! ```ignore
//! use crate::feeds::{ExchangeFeed, FeedFactory, FeedHandle, RawQuote};
//! ```

pub mod errors;
pub mod handle;
pub mod json;
pub mod traits;
pub mod types;
pub mod websocket;

#[cfg(test)]
pub(crate) mod test_utils;

// Explicit re-exports
pub use errors::{FeedError, FeedErrorCategory, FeedResult};
pub use handle::FeedHandle;
pub use json::{render_template, JsonFeed, JsonFeedFactory};
pub use traits::{ExchangeFeed, FeedFactory};
pub use types::{BookSnapshot, FeedCapabilities, RawQuote};
