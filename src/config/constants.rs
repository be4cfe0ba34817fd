//! Runtime constants with environment variable overrides
//!
//! Values that are tuned per deployment rather than per exchange live
//! here instead of in the YAML file.

use std::time::Duration;

// =============================================================================
// Feed Configuration
// =============================================================================

/// Order-book depth requested by streaming feeds (default: 10 levels)
///
/// Environment variable: `ORDER_BOOK_DEPTH`
pub fn order_book_depth() -> usize {
    std::env::var("ORDER_BOOK_DEPTH")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|depth: &usize| *depth > 0)
        .unwrap_or(10)
}

/// Pause between two streaming cycles (default: 100ms)
///
/// Environment variable: `STREAM_PAUSE_MS`
pub fn stream_pause() -> Duration {
    let ms = std::env::var("STREAM_PAUSE_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    Duration::from_millis(ms)
}

/// REST request timeout for the JSON feed (default: 10 seconds)
///
/// Environment variable: `HTTP_TIMEOUT_SECS`
pub fn http_timeout() -> Duration {
    let secs = std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs: &u64| *secs > 0)
        .unwrap_or(10);
    Duration::from_secs(secs)
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Entries kept per (exchange, symbol) ring buffer
pub const PRICE_HISTORY_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        std::env::remove_var("ORDER_BOOK_DEPTH");
        std::env::remove_var("STREAM_PAUSE_MS");
        std::env::remove_var("HTTP_TIMEOUT_SECS");

        assert_eq!(order_book_depth(), 10);
        assert_eq!(stream_pause(), Duration::from_millis(100));
        assert_eq!(http_timeout(), Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("ORDER_BOOK_DEPTH", "25");
        std::env::set_var("STREAM_PAUSE_MS", "5");
        std::env::set_var("HTTP_TIMEOUT_SECS", "3");

        assert_eq!(order_book_depth(), 25);
        assert_eq!(stream_pause(), Duration::from_millis(5));
        assert_eq!(http_timeout(), Duration::from_secs(3));

        std::env::remove_var("ORDER_BOOK_DEPTH");
        std::env::remove_var("STREAM_PAUSE_MS");
        std::env::remove_var("HTTP_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        std::env::set_var("ORDER_BOOK_DEPTH", "0");
        std::env::set_var("HTTP_TIMEOUT_SECS", "soon");

        assert_eq!(order_book_depth(), 10);
        assert_eq!(http_timeout(), Duration::from_secs(10));

        std::env::remove_var("ORDER_BOOK_DEPTH");
        std::env::remove_var("HTTP_TIMEOUT_SECS");
    }
}
