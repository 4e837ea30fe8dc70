//! Error types for the metrics aggregator
//!
//! Recording never fails. These errors only come out of configuration loading
//! and adapter construction.

use thiserror::Error;

/// Metrics error types
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration value out of range
    #[error("Invalid configuration - {field}: {message}")]
    InvalidConfig {
        /// Offending field
        field: String,
        /// Why it was rejected
        message: String,
    },

    /// No async runtime available for the tokio scheduler
    #[error("Scheduler unavailable: {0}")]
    SchedulerUnavailable(String),
}

/// Result type for metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;
