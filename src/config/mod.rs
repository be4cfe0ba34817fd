//! Configuration module for scanner settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`AppConfig`, `ExchangeConfig`, `EndpointSet`, ...)
//! - YAML loading functionality (`load_config`)
//! - Logging initialization
//! - Runtime constants with environment variable overrides

pub mod constants;
mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{
    AppConfig, DetectorSettings, EndpointSet, ExchangeConfig, ExchangeEndpoints, MinVolumeConfig,
    RetrySettings,
};

// Re-export loader functions
pub use loader::{config_path, load_config, load_config_from_str, DEFAULT_CONFIG_PATH};
