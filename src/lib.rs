//! Multi-exchange crypto arbitrage scanner
//!
//! - Exchange feeds (streaming with REST polling fallback)
//! - Quote validation and a bounded per-(exchange, symbol) price store
//! - Triangular and spatial opportunity detection

pub mod config;
pub mod core;
pub mod error;
pub mod feeds;

pub use error::AppError;
