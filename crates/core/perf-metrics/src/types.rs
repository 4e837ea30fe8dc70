//! Sample records, stat rows and summary snapshots

use serde::{Deserialize, Serialize};

use crate::stats::StatRow;

/// Render statistics for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRenderStat {
    /// Component identifier
    pub component_id: String,
    /// Running render-time aggregate
    #[serde(flatten)]
    pub stat: StatRow,
}

impl ComponentRenderStat {
    pub(crate) fn new(component_id: &str) -> Self {
        Self {
            component_id: component_id.to_string(),
            stat: StatRow::new(),
        }
    }
}

/// Processing statistics for one data operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStat {
    /// Operation identifier
    pub operation_id: String,
    /// Running processing-time aggregate
    #[serde(flatten)]
    pub stat: StatRow,
    /// Size of the last processed payload (bytes or items), not accumulated
    pub data_size: u64,
}

impl OperationStat {
    pub(crate) fn new(operation_id: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            stat: StatRow::new(),
            data_size: 0,
        }
    }
}

/// One outbound HTTP call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Time to response (ms)
    pub response_time_ms: f64,
    /// HTTP status code
    pub status_code: u16,
    /// Response body size (bytes)
    pub data_size_bytes: u64,
    /// Wall-clock time of the sample (ms since epoch)
    pub timestamp_ms: u64,
}

impl NetworkSample {
    /// 2xx and 3xx responses count as successful
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 400
    }
}

/// One inbound real-time message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketMessageSample {
    /// Message type tag
    pub message_type: String,
    /// Message size (bytes)
    pub message_size_bytes: u64,
    /// Handler time (ms)
    pub processing_time_ms: f64,
    /// Time spent queued before handling (ms), when known
    pub queue_time_ms: Option<f64>,
    /// Wall-clock time of the sample (ms since epoch)
    pub timestamp_ms: u64,
}

/// Raw history entry kept for the summary and for replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricEvent {
    /// Component or operation the sample belongs to
    pub subject_name: String,
    /// Render time (ms), zero for processing samples
    pub render_time_ms: f64,
    /// Processing time (ms), zero for render samples
    pub data_processing_time_ms: f64,
    /// Wall-clock time of the sample (ms since epoch)
    pub timestamp_ms: u64,
}

/// Aggregate figures across every row of each domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    /// Sum of all render time (ms)
    pub total_render_time_ms: f64,
    /// Count-weighted mean render time (ms)
    pub average_render_time_ms: f64,
    /// Sum of all processing time (ms)
    pub total_processing_time_ms: f64,
    /// Count-weighted mean processing time (ms)
    pub average_processing_time_ms: f64,
    /// Mean response time over stored network samples (ms)
    pub average_network_time_ms: f64,
    /// Mean processing time over stored socket samples (ms)
    pub average_socket_processing_time_ms: f64,
}

/// Success and failure counts over stored network samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcomes {
    /// 2xx/3xx responses
    pub successes: u64,
    /// Everything else
    pub failures: u64,
}

impl RequestOutcomes {
    /// Success ratio (0.0 to 1.0), zero when nothing was recorded
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total > 0 {
            // SAFETY: u64 to f64 for rate calculation
            self.successes as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Point-in-time performance summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Top components by average render time
    pub slowest_components: Vec<ComponentRenderStat>,
    /// Top operations by average processing time
    pub slowest_operations: Vec<OperationStat>,
    /// Slowest stored network samples
    pub slowest_network_requests: Vec<NetworkSample>,
    /// Slowest stored socket samples
    pub slowest_socket_messages: Vec<SocketMessageSample>,
    /// Domain-wide totals and averages
    pub totals: SummaryTotals,
    /// Network success/failure counts
    pub network_outcomes: RequestOutcomes,
    /// Entries held in the raw history
    pub recorded_events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_success_classification() {
        let mut sample = NetworkSample {
            url: "/api/quotes".to_string(),
            method: "GET".to_string(),
            response_time_ms: 12.0,
            status_code: 200,
            data_size_bytes: 512,
            timestamp_ms: 0,
        };
        assert!(sample.is_success());
        sample.status_code = 304;
        assert!(sample.is_success());
        sample.status_code = 503;
        assert!(!sample.is_success());
    }

    #[test]
    fn test_success_rate_from_raw_counts() {
        let outcomes = RequestOutcomes {
            successes: 3,
            failures: 1,
        };
        assert_eq!(outcomes.success_rate(), 0.75);
        assert_eq!(RequestOutcomes::default().success_rate(), 0.0);
    }

    #[test]
    fn test_component_stat_serializes_flat() {
        let stat = ComponentRenderStat::new("Grid");
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["component_id"], "Grid");
        assert_eq!(json["count"], 0);
        assert!(json.get("stat").is_none());
    }
}
