//! Aggregator configuration

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};
use crate::throttle::DEFAULT_WINDOW_MS;

/// Environment prefix for overrides (`PERF_METRICS_MAX_STORED_METRICS=500`)
pub const ENV_PREFIX: &str = "PERF_METRICS";

/// Aggregator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Record operations are no-ops while false
    pub enabled: bool,
    /// Bound applied to each sample log
    pub max_stored_metrics: usize,
    /// Render/processing time above which a sample counts as slow (ms)
    pub warning_threshold_ms: f64,
    /// Minimum gap between two notifications on one channel (ms)
    pub notification_window_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_stored_metrics: 1000,
            warning_threshold_ms: 16.0, // one frame at 60 Hz
            notification_window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from file, with `PERF_METRICS_*` environment overrides
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or a value is out of range
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path), ENV_PREFIX)
    }

    /// Load configuration from environment variables only
    ///
    /// # Errors
    /// Returns an error if a variable cannot be parsed or a value is out of range
    pub fn from_env() -> Result<Self> {
        Self::load(None, ENV_PREFIX)
    }

    /// Load from an optional file and an environment prefix, then validate
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or a value is out of range
    pub fn load(path: Option<&str>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the aggregator cannot work with
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidConfig`] naming the first bad field
    pub fn validate(&self) -> Result<()> {
        if self.max_stored_metrics == 0 {
            return Err(MetricsError::InvalidConfig {
                field: "max_stored_metrics".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.warning_threshold_ms.is_finite() || self.warning_threshold_ms < 0.0 {
            return Err(MetricsError::InvalidConfig {
                field: "warning_threshold_ms".to_string(),
                message: format!(
                    "must be a non-negative number, got {}",
                    self.warning_threshold_ms
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.max_stored_metrics, 1000);
        assert_eq!(config.warning_threshold_ms, 16.0);
        assert_eq!(config.notification_window_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bound() {
        let config = AggregatorConfig {
            max_stored_metrics: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MetricsError::InvalidConfig { field, .. }) if field == "max_stored_metrics"
        ));
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let config = AggregatorConfig {
            warning_threshold_ms: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AggregatorConfig {
            warning_threshold_ms: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AggregatorConfig =
            serde_json::from_str(r#"{"enabled": true, "max_stored_metrics": 50}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.max_stored_metrics, 50);
        assert_eq!(config.warning_threshold_ms, 16.0);
    }
}
