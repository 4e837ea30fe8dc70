//! Monitoring service
//!
//! Hosts a [`perf_metrics::MetricsAggregator`] and serves its snapshots over
//! REST for the dashboard tooling.

pub mod api;
pub mod config;
pub mod simulation;

pub use api::{AppState, router};
pub use config::MonitoringConfig;
