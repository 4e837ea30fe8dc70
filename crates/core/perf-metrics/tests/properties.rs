//! Property-based tests for aggregator invariants
//!
//! - Sample logs never exceed the configured bound and keep the newest entries
//! - A stat row's aggregates agree with the samples fed into it
//! - Summary rankings are sorted and capped

use approx::assert_relative_eq;
use perf_metrics::*;
use proptest::prelude::*;

fn enabled() -> MetricsAggregator {
    MetricsAggregator::new(AggregatorConfig {
        enabled: true,
        ..Default::default()
    })
}

/// Durations a host would plausibly report (ms)
fn arb_duration() -> impl Strategy<Value = f64> {
    0.0f64..500.0f64
}

fn arb_component() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Grid".to_string()),
        Just("Chart".to_string()),
        Just("Ticker".to_string()),
        Just("OrderForm".to_string()),
        Just("Depth".to_string()),
        Just("Positions".to_string()),
        Just("Blotter".to_string()),
    ]
}

proptest! {
    #[test]
    fn prop_network_log_is_bounded(
        bound in 1usize..20,
        times in prop::collection::vec(arb_duration(), 0..60),
    ) {
        let aggregator = enabled();
        aggregator.set_max_stored_metrics(bound);

        for (i, t) in times.iter().enumerate() {
            aggregator.record_network_sample(NetworkSample {
                url: format!("/api/{i}"),
                method: "GET".to_string(),
                response_time_ms: *t,
                status_code: 200,
                data_size_bytes: 0,
                timestamp_ms: 0,
            });
        }

        let stored = aggregator.get_network_samples(None);
        prop_assert_eq!(stored.len(), times.len().min(bound));

        // Newest entries survive, oldest first
        let skipped = times.len().saturating_sub(bound);
        for (offset, sample) in stored.iter().enumerate() {
            prop_assert_eq!(&sample.url, &format!("/api/{}", skipped + offset));
        }
    }

    #[test]
    fn prop_stat_row_matches_samples(times in prop::collection::vec(arb_duration(), 1..50)) {
        let aggregator = enabled();
        for t in &times {
            aggregator.record_component_render("Grid", *t);
        }

        let row = aggregator.get_component_stat("Grid").unwrap();
        let total: f64 = times.iter().sum();
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        prop_assert_eq!(row.stat.count, times.len() as u64);
        prop_assert_eq!(row.stat.min_value, min);
        prop_assert_eq!(row.stat.max_value, max);
        prop_assert_eq!(row.stat.last_value, *times.last().unwrap());
        assert_relative_eq!(row.stat.total_value, total, max_relative = 1e-9);
        assert_relative_eq!(
            row.stat.average_value,
            total / times.len() as f64,
            max_relative = 1e-9
        );
        prop_assert!(row.stat.min_value <= row.stat.average_value + 1e-9);
        prop_assert!(row.stat.average_value <= row.stat.max_value + 1e-9);
    }

    #[test]
    fn prop_summary_rankings_sorted_and_capped(
        samples in prop::collection::vec((arb_component(), arb_duration()), 0..80),
    ) {
        let aggregator = enabled();
        for (component, t) in &samples {
            aggregator.record_component_render(component, *t);
        }

        let summary = aggregator.get_summary();
        let rows = aggregator.get_component_stats();
        prop_assert_eq!(summary.slowest_components.len(), rows.len().min(5));

        for pair in summary.slowest_components.windows(2) {
            prop_assert!(pair[0].stat.average_value >= pair[1].stat.average_value);
        }

        let recorded: u64 = rows.iter().map(|row| row.stat.count).sum();
        prop_assert_eq!(recorded, samples.len() as u64);
    }
}
