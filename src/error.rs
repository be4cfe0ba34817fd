//! Application-wide error types using thiserror
//!
//! Startup failures are wrapped in AppError. Feed failures keep their own
//! `FeedError` taxonomy and stay inside the supervisor, which reports
//! them through `SupervisorOutcome`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
