//! Core module - quote validation, price store, detection, supervision
//!
//! This module uses **explicit re-exports** instead of glob exports
//! (`pub use module::*`) so the public API only changes on purpose.
//!
//! ## Usage
//! ```ignore
//! use crate::core::{PriceStore, ArbitrageDetector, FeedSupervisor};
//! ```

pub mod detector;
pub mod runtime;
pub mod sink;
pub mod store;
pub mod supervisor;
pub mod triangle;
pub mod types;
pub mod validator;

// Explicit re-exports for types module
pub use types::{current_time_ms, EnhancedQuote, Opportunity, Side, TradeLeg};

// Explicit re-exports for validator module
pub use validator::{validate, volume_score, Rejection};

// Explicit re-exports for store module
pub use store::PriceStore;

// Explicit re-exports for triangle module
pub use triangle::{discover_triangles, split_symbol, Triangle};

// Explicit re-exports for detector module
pub use detector::{ArbitrageDetector, DetectorConfig};

// Explicit re-exports for sink module
pub use sink::{BroadcastSink, LogSink, OpportunitySink};

// Explicit re-exports for supervisor module
pub use supervisor::{
    FeedState, FeedSupervisor, RetryPolicy, SupervisorConfig, SupervisorOutcome, SupervisorReport,
};

// Explicit re-exports for runtime module
pub use runtime::{run_scanner, ExchangeOutcome, ScannerSummary};
