//! Configuration types for the arbitrage scanner
//!
//! This module defines all configuration structs that are loaded from YAML
//! once at startup and shared across the application via `Arc<AppConfig>`.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::triangle::{split_symbol, Triangle};
use crate::error::AppError;

// ============================================================================
// Defaults
// ============================================================================

fn default_poll_interval_seconds() -> f64 {
    1.0
}

fn default_triangles() -> Vec<[String; 3]> {
    vec![[
        "BTC/USDT".to_string(),
        "ETH/BTC".to_string(),
        "ETH/USDT".to_string(),
    ]]
}

fn default_detector_interval_ms() -> u64 {
    50
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    10
}

fn default_max_delay_secs() -> u64 {
    300
}

// ============================================================================
// Exchange Endpoints
// ============================================================================

/// URL templates for one environment (live or testnet)
///
/// Templates may contain `{symbol}`, `{symbol_lower}`, `{base}`, `{quote}`
/// and `{depth}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EndpointSet {
    /// REST ticker snapshot URL (polling mode)
    #[serde(default)]
    pub rest_ticker: Option<String>,
    /// WebSocket ticker push URL (streaming mode)
    #[serde(default)]
    pub ws_ticker: Option<String>,
    /// WebSocket order-book push URL (streaming mode)
    #[serde(default)]
    pub ws_order_book: Option<String>,
}

impl EndpointSet {
    pub fn is_empty(&self) -> bool {
        self.rest_ticker.is_none() && self.ws_ticker.is_none() && self.ws_order_book.is_none()
    }
}

/// Live endpoints plus optional sandbox endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ExchangeEndpoints {
    #[serde(flatten)]
    pub live: EndpointSet,
    #[serde(default)]
    pub testnet: Option<EndpointSet>,
}

impl ExchangeEndpoints {
    /// Pick the endpoint set for the requested environment.
    ///
    /// Returns `None` when testnet is requested but not configured.
    pub fn resolve(&self, testnet: bool) -> Option<&EndpointSet> {
        if testnet {
            self.testnet.as_ref()
        } else {
            Some(&self.live)
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Per-exchange monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Symbols to monitor (e.g. ["BTC/USDT", "ETH/BTC"])
    pub symbols: Vec<String>,
    /// Delay between REST requests in polling mode (seconds)
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: f64,
    /// Feed endpoints used by the generic JSON feed
    #[serde(default)]
    pub endpoints: ExchangeEndpoints,
}

impl ExchangeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_seconds)
    }

    fn validate(&self, exchange_id: &str) -> Result<(), AppError> {
        if exchange_id.trim().is_empty() {
            return Err(AppError::Config("Exchange ID cannot be empty".to_string()));
        }

        if self.symbols.is_empty() {
            return Err(AppError::Config(format!(
                "Exchange '{}' must list at least one symbol",
                exchange_id
            )));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if split_symbol(symbol).is_none() {
                return Err(AppError::Config(format!(
                    "Exchange '{}': symbol '{}' must look like BASE/QUOTE",
                    exchange_id, symbol
                )));
            }
            if !seen.insert(symbol) {
                return Err(AppError::Config(format!(
                    "Exchange '{}': duplicate symbol '{}'",
                    exchange_id, symbol
                )));
            }
        }

        if !self.poll_interval_seconds.is_finite() || self.poll_interval_seconds <= 0.0 {
            return Err(AppError::Config(format!(
                "Exchange '{}': poll_interval_seconds must be a positive number (got {})",
                exchange_id, self.poll_interval_seconds
            )));
        }

        Ok(())
    }
}

/// Liquidity thresholds per algorithm (USD)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinVolumeConfig {
    pub triangular: f64,
    pub spatial: f64,
}

/// Detector loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSettings {
    #[serde(default = "default_detector_interval_ms")]
    pub interval_ms: u64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_detector_interval_ms(),
        }
    }
}

/// Supervisor retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// exchange id → monitoring configuration
    pub exchanges: BTreeMap<String, ExchangeConfig>,
    /// Raw profit threshold (percent) for both algorithms; fold fees in here
    pub min_profit_percentage: f64,
    /// Use each exchange's sandbox endpoints
    pub testnet: bool,
    /// Quotes older than this are not tradeable
    pub max_age_seconds: f64,
    pub min_volume_usd: MinVolumeConfig,
    /// Curated triangles as `[A/C, B/A, B/C]`
    #[serde(default = "default_triangles")]
    pub triangles: Vec<[String; 3]>,
    /// Also scan triangles discovered from each exchange's symbol list
    #[serde(default)]
    pub discover_triangles: bool,
    /// Enforce `min_volume_usd` in `latest_tradeable` (off by default)
    #[serde(default)]
    pub enforce_liquidity_gate: bool,
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        for (exchange_id, exchange) in &self.exchanges {
            exchange.validate(exchange_id)?;
        }

        if !self.min_profit_percentage.is_finite() {
            return Err(AppError::Config(format!(
                "min_profit_percentage must be a finite number (got {})",
                self.min_profit_percentage
            )));
        }

        if !self.max_age_seconds.is_finite() || self.max_age_seconds <= 0.0 {
            return Err(AppError::Config(format!(
                "max_age_seconds must be a positive number (got {})",
                self.max_age_seconds
            )));
        }

        for (key, value) in [
            ("triangular", self.min_volume_usd.triangular),
            ("spatial", self.min_volume_usd.spatial),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::Config(format!(
                    "min_volume_usd.{} must be a positive number (got {})",
                    key, value
                )));
            }
        }

        for legs in &self.triangles {
            Triangle::new(&legs[0], &legs[1], &legs[2])?;
        }

        if self.detector.interval_ms == 0 {
            return Err(AppError::Config(
                "detector.interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.retry.base_delay_secs == 0 || self.retry.base_delay_secs > self.retry.max_delay_secs
        {
            return Err(AppError::Config(format!(
                "retry delays must satisfy 0 < base_delay_secs <= max_delay_secs (got {} and {})",
                self.retry.base_delay_secs, self.retry.max_delay_secs
            )));
        }

        Ok(())
    }

    /// Configured exchange ids in stable order
    pub fn exchange_ids(&self) -> Vec<String> {
        self.exchanges.keys().cloned().collect()
    }

    pub fn exchange_symbols(&self, exchange_id: &str) -> Option<&[String]> {
        self.exchanges.get(exchange_id).map(|e| e.symbols.as_slice())
    }

    /// Poll interval for an exchange (1s when the exchange is unknown)
    pub fn poll_interval(&self, exchange_id: &str) -> Duration {
        self.exchanges
            .get(exchange_id)
            .map(ExchangeConfig::poll_interval)
            .unwrap_or_else(|| Duration::from_secs_f64(default_poll_interval_seconds()))
    }

    /// Every distinct symbol across all exchanges, sorted
    pub fn all_symbols(&self) -> Vec<String> {
        self.exchanges
            .values()
            .flat_map(|e| e.symbols.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Parsed curated triangles (call after `validate`)
    pub fn parsed_triangles(&self) -> Result<Vec<Triangle>, AppError> {
        self.triangles
            .iter()
            .map(|legs| Triangle::new(&legs[0], &legs[1], &legs[2]))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
