//! Monitoring service configuration

use anyhow::{Context, Result};
use perf_metrics::AggregatorConfig;
use serde::{Deserialize, Serialize};

/// Monitoring service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Server settings
    pub server: ServerConfig,
    /// Synthetic host load
    pub simulation: SimulationConfig,
    /// Aggregator settings
    pub metrics: AggregatorConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

/// Synthetic dashboard load used to exercise the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Run the simulation task
    pub enabled: bool,
    /// Delay between simulated frames (ms)
    pub interval_ms: u64,
    /// Simulated component identifiers
    pub components: Vec<String>,
    /// Simulated data-processing operations
    pub operations: Vec<String>,
    /// Simulated REST endpoints
    pub endpoints: Vec<String>,
    /// Simulated socket message types
    pub message_types: Vec<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            simulation: SimulationConfig::default(),
            metrics: AggregatorConfig {
                enabled: true,
                ..AggregatorConfig::default()
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50063,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> {
            items.iter().map(ToString::to_string).collect()
        };
        Self {
            enabled: true,
            interval_ms: 250,
            components: owned(&["OrderBook", "PriceChart", "Positions", "Watchlist"]),
            operations: owned(&["aggregateDepth", "computePnl", "parseTicks"]),
            endpoints: owned(&["/api/v1/orders", "/api/v1/positions", "/api/v1/quotes"]),
            message_types: owned(&["tick", "depth", "orderUpdate"]),
        }
    }
}

impl MonitoringConfig {
    /// Load configuration from file with `MONITORING__*` environment overrides
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or a value is out of range
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MONITORING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config
            .metrics
            .validate()
            .context("invalid [metrics] section")?;
        Ok(config)
    }

    /// Get server address
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
