//! Exchange feed error types
//!
//! All feed-related errors are wrapped in FeedError enum
//! which implements thiserror for consistent error handling.
//! The classification helpers decide how the supervisor reacts:
//! per-item errors are logged and skipped, stream failures trigger the
//! polling fallback, fatal errors end the monitoring attempt.

use thiserror::Error;

/// Feed-specific error types for collaborator operations
#[derive(Error, Debug)]
pub enum FeedError {
    /// Connection to exchange failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Host name could not be resolved
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// TLS handshake or certificate failure
    #[error("TLS error: {0}")]
    Tls(String),

    /// Network operation timed out
    #[error("Network timeout after {0}ms")]
    Timeout(u64),

    /// Subscription to market data failed
    #[error("Subscription failed for {symbol}: {reason}")]
    SubscriptionFailed { symbol: String, reason: String },

    /// Invalid or unexpected response from exchange
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// HTTP request failed for a reason other than connect/timeout
    #[error("HTTP error: {0}")]
    Http(String),

    /// The feed cannot serve the request at all (missing endpoint, no sandbox)
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The feed handle was already closed
    #[error("Feed closed")]
    Closed,
}

/// Coarse error category used for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorCategory {
    Dns,
    Tls,
    Timeout,
    Connection,
    Protocol,
    Unsupported,
}

impl std::fmt::Display for FeedErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedErrorCategory::Dns => write!(f, "dns"),
            FeedErrorCategory::Tls => write!(f, "tls"),
            FeedErrorCategory::Timeout => write!(f, "timeout"),
            FeedErrorCategory::Connection => write!(f, "connection"),
            FeedErrorCategory::Protocol => write!(f, "protocol"),
            FeedErrorCategory::Unsupported => write!(f, "unsupported"),
        }
    }
}

impl FeedError {
    /// Classify the error for logging.
    ///
    /// Free-form connection messages are inspected for DNS/TLS/timeout
    /// markers since transports often report those as plain strings.
    pub fn category(&self) -> FeedErrorCategory {
        match self {
            FeedError::Dns(_) => FeedErrorCategory::Dns,
            FeedError::Tls(_) => FeedErrorCategory::Tls,
            FeedError::Timeout(_) => FeedErrorCategory::Timeout,
            FeedError::Unsupported(_) => FeedErrorCategory::Unsupported,
            FeedError::SubscriptionFailed { .. } | FeedError::InvalidResponse(_) => {
                FeedErrorCategory::Protocol
            }
            FeedError::ConnectionFailed(msg) | FeedError::Http(msg) => classify_message(msg),
            FeedError::WebSocket(e) => classify_message(&e.to_string()),
            FeedError::Closed => FeedErrorCategory::Connection,
        }
    }

    /// True when the whole stream is gone rather than a single update.
    pub fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            FeedError::ConnectionFailed(_)
                | FeedError::Dns(_)
                | FeedError::Tls(_)
                | FeedError::Timeout(_)
                | FeedError::WebSocket(_)
                | FeedError::Closed
        )
    }

    /// True when retrying the same request on the same handle is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::Unsupported(_) | FeedError::Closed)
    }
}

fn classify_message(msg: &str) -> FeedErrorCategory {
    let lower = msg.to_lowercase();
    if lower.contains("dns") || lower.contains("resolve") {
        FeedErrorCategory::Dns
    } else if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
        FeedErrorCategory::Tls
    } else if lower.contains("timeout") || lower.contains("timed out") {
        FeedErrorCategory::Timeout
    } else {
        FeedErrorCategory::Connection
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::WebSocket(Box::new(e))
    }
}

/// Result type alias for feed operations
pub type FeedResult<T> = std::result::Result<T, FeedError>;
