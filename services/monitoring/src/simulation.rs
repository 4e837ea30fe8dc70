//! Synthetic dashboard load
//!
//! Stands in for a live front end so the aggregator has samples to serve.

use perf_metrics::{Clock, MetricsAggregator, NetworkSample, SocketMessageSample, SystemClock};
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SimulationConfig;

/// Status codes drawn for simulated requests, weighted towards success
const STATUS_CODES: [u16; 8] = [200, 200, 200, 200, 201, 304, 404, 503];

/// Record one simulated frame worth of samples
pub fn simulate_frame(metrics: &MetricsAggregator, config: &SimulationConfig) {
    let mut rng = rand::thread_rng();
    let now_ms = SystemClock.now_millis();

    for component in &config.components {
        // Mostly within a 60 Hz frame, with an occasional long render
        let render_ms = if rng.gen_bool(0.05) {
            rng.gen_range(20.0..60.0)
        } else {
            rng.gen_range(1.0..12.0)
        };
        metrics.record_component_render(component, render_ms);
    }

    if let Some(operation) = config.operations.choose(&mut rng) {
        let items: u64 = rng.gen_range(100..5_000);
        let checksum = metrics.measure_data_processing(operation, items, || {
            (0..items).fold(0u64, |acc, x| acc.wrapping_mul(31).wrapping_add(x))
        });
        debug!(operation = %operation, items, checksum, "Simulated processing");
    }

    if let Some(url) = config.endpoints.choose(&mut rng) {
        metrics.record_network_sample(NetworkSample {
            url: url.clone(),
            method: if rng.gen_bool(0.8) { "GET" } else { "POST" }.to_string(),
            response_time_ms: rng.gen_range(5.0..80.0),
            status_code: STATUS_CODES[rng.gen_range(0..STATUS_CODES.len())],
            data_size_bytes: rng.gen_range(128..64 * 1024),
            timestamp_ms: now_ms,
        });
    }

    if let Some(message_type) = config.message_types.choose(&mut rng) {
        metrics.record_socket_sample(SocketMessageSample {
            message_type: message_type.clone(),
            message_size_bytes: rng.gen_range(64..4_096),
            processing_time_ms: rng.gen_range(0.1..20.0),
            queue_time_ms: rng.gen_bool(0.5).then(|| rng.gen_range(0.0..5.0)),
            timestamp_ms: now_ms,
        });
    }
}

/// Run [`simulate_frame`] on a fixed interval until the runtime shuts down
pub fn spawn(metrics: MetricsAggregator, config: SimulationConfig) -> JoinHandle<()> {
    info!(
        interval_ms = config.interval_ms,
        components = config.components.len(),
        "Starting simulated dashboard load"
    );
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(config.interval_ms.max(1)));
        loop {
            interval.tick().await;
            simulate_frame(&metrics, &config);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use perf_metrics::AggregatorConfig;

    #[test]
    fn test_frame_feeds_every_domain() {
        let metrics = MetricsAggregator::new(AggregatorConfig {
            enabled: true,
            ..Default::default()
        });
        let config = SimulationConfig::default();

        simulate_frame(&metrics, &config);

        assert_eq!(metrics.get_component_stats().len(), config.components.len());
        assert_eq!(metrics.get_operation_stats().len(), 1);
        assert_eq!(metrics.get_network_samples(None).len(), 1);
        assert_eq!(metrics.get_socket_samples(None).len(), 1);
    }

    #[test]
    fn test_empty_lists_are_skipped() {
        let metrics = MetricsAggregator::new(AggregatorConfig {
            enabled: true,
            ..Default::default()
        });
        let config = SimulationConfig {
            components: Vec::new(),
            operations: Vec::new(),
            endpoints: Vec::new(),
            message_types: Vec::new(),
            ..Default::default()
        };

        simulate_frame(&metrics, &config);
        assert_eq!(metrics.get_summary().recorded_events, 0);
    }
}
