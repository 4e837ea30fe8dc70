//! Client-side performance metrics aggregator
//!
//! Running statistics over timing samples for the dashboard:
//! - Component render time, keyed by component
//! - Data-processing time, keyed by operation
//! - Network request samples (bounded log)
//! - Real-time socket message samples (bounded log)
//!
//! Stat updates are buffered and flushed through a host-provided [`Scheduler`],
//! notifications go through a fixed-window [`RateLimiter`], and every read
//! flushes first so callers always see their own writes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregator;
pub mod bounded;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod stats;
pub mod throttle;
pub mod types;

pub use aggregator::MetricsAggregator;
pub use bounded::BoundedLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AggregatorConfig;
pub use error::{MetricsError, Result};
pub use events::{EventType, MetricEvent, Subscription};
pub use scheduler::{IdleTask, ImmediateScheduler, ManualScheduler, Scheduler, TokioScheduler};
pub use stats::StatRow;
pub use throttle::RateLimiter;
pub use types::{
    ComponentRenderStat, NetworkSample, OperationStat, PerformanceSummary, RawMetricEvent,
    RequestOutcomes, SocketMessageSample, SummaryTotals,
};
