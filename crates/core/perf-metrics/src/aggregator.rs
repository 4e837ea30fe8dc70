//! Performance metrics aggregator
//!
//! One aggregator is built by the application's composition root and handed
//! to every instrumented call site as a cheap clone of the same handle.
//!
//! Write path:
//! - Render and processing rows are staged in a pending buffer and moved into
//!   the live maps by a flush scheduled through the host [`Scheduler`]
//! - Network and socket samples go straight into bounded logs
//! - Notifications pass a fixed-window throttle per channel
//!
//! Read path: every row read flushes the pending buffer first.

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::bounded::BoundedLog;
use crate::clock::{Clock, SystemClock};
use crate::config::AggregatorConfig;
use crate::events::{EventType, MetricEvent, SubscriberRegistry, Subscription};
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::throttle::RateLimiter;
use crate::types::{
    ComponentRenderStat, NetworkSample, OperationStat, PerformanceSummary, RawMetricEvent,
    RequestOutcomes, SocketMessageSample, SummaryTotals,
};

/// Rows kept per summary ranking
pub const SUMMARY_TOP_N: usize = 5;

/// Network samples get a wider margin since they are not execution-time bound
const NETWORK_THRESHOLD_FACTOR: f64 = 2.0;

type RowMap<T> = IndexMap<String, T, FxBuildHasher>;

/// Throttle channels: subscriber notifications and warning logs are gated apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ThrottleKey {
    Notify(EventType),
    SlowWarning(EventType),
}

/// Mutable aggregator state, guarded by one lock
struct State {
    components: RowMap<ComponentRenderStat>,
    operations: RowMap<OperationStat>,
    pending_components: RowMap<ComponentRenderStat>,
    pending_operations: RowMap<OperationStat>,
    network: BoundedLog<NetworkSample>,
    socket: BoundedLog<SocketMessageSample>,
    history: BoundedLog<RawMetricEvent>,
    update_scheduled: bool,
}

impl State {
    fn new(max_stored_metrics: usize) -> Self {
        Self {
            components: RowMap::default(),
            operations: RowMap::default(),
            pending_components: RowMap::default(),
            pending_operations: RowMap::default(),
            network: BoundedLog::new(max_stored_metrics),
            socket: BoundedLog::new(max_stored_metrics),
            history: BoundedLog::new(max_stored_metrics),
            update_scheduled: false,
        }
    }

    /// Returns true when the caller must schedule a flush
    fn mark_flush_scheduled(&mut self) -> bool {
        !std::mem::replace(&mut self.update_scheduled, true)
    }

    /// Move every pending row into the live maps
    fn apply_pending(&mut self) -> usize {
        self.update_scheduled = false;
        let applied = self.pending_components.len() + self.pending_operations.len();
        for (key, row) in self.pending_components.drain(..) {
            self.components.insert(key, row);
        }
        for (key, row) in self.pending_operations.drain(..) {
            self.operations.insert(key, row);
        }
        applied
    }

    fn clear(&mut self) {
        self.components.clear();
        self.operations.clear();
        self.pending_components.clear();
        self.pending_operations.clear();
        self.network.clear();
        self.socket.clear();
        self.history.clear();
        self.update_scheduled = false;
    }
}

/// Fetch the staged row for `key`, seeding it from the live row or `create`
fn stage<'a, T: Clone>(
    pending: &'a mut RowMap<T>,
    live: &RowMap<T>,
    key: &str,
    create: impl FnOnce() -> T,
) -> &'a mut T {
    let index = match pending.get_index_of(key) {
        Some(index) => index,
        None => {
            let seed = live.get(key).cloned().unwrap_or_else(create);
            pending.insert_full(key.to_string(), seed).0
        }
    };
    &mut pending[index]
}

/// Negative durations clamp to zero; NaN and infinities are dropped
fn sanitize_duration(value: f64) -> Option<f64> {
    value.is_finite().then(|| value.max(0.0))
}

fn mean(total: f64, count: u64) -> f64 {
    if count > 0 {
        // SAFETY: u64 to f64 for average calculation
        total / count as f64
    } else {
        0.0
    }
}

fn top_n<T: Clone>(mut rows: Vec<&T>, key: impl Fn(&T) -> f64) -> Vec<T> {
    // Stable sort: ties keep insertion order
    rows.sort_by(|a, b| key(*b).total_cmp(&key(*a)));
    rows.into_iter().take(SUMMARY_TOP_N).cloned().collect()
}

struct Inner {
    enabled: AtomicBool,
    warning_threshold_ms: RwLock<f64>,
    state: Mutex<State>,
    limiter: Mutex<RateLimiter<ThrottleKey>>,
    subscribers: Arc<SubscriberRegistry>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
}

impl Inner {
    fn flush(&self) -> usize {
        let applied = self.state.lock().apply_pending();
        if applied > 0 {
            trace!(rows = applied, "Flushed pending metric rows");
        }
        applied
    }

    fn lock_flushed(&self) -> MutexGuard<'_, State> {
        let mut state = self.state.lock();
        state.apply_pending();
        state
    }

    fn try_fire(&self, key: ThrottleKey, tick_ms: u64) -> bool {
        self.limiter.lock().try_acquire(key, tick_ms)
    }

    /// Publish `event` unless its channel fired within the window
    fn emit(&self, tick_ms: u64, event: MetricEvent) {
        let event_type = event.event_type();
        if self.try_fire(ThrottleKey::Notify(event_type), tick_ms) {
            self.subscribers.publish(&event);
        } else {
            trace!(event_type = %event_type, "Notification throttled");
        }
    }

    fn threshold(&self) -> f64 {
        *self.warning_threshold_ms.read()
    }
}

/// Shared handle to the performance metrics aggregator
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Clone)]
pub struct MetricsAggregator {
    inner: Arc<Inner>,
}

impl MetricsAggregator {
    /// Create an aggregator that flushes inline and reads the system clock
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_runtime(config, Arc::new(ImmediateScheduler), Arc::new(SystemClock))
    }

    /// Create an aggregator with host-provided scheduling and time
    #[must_use]
    pub fn with_runtime(
        config: AggregatorConfig,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let threshold = sanitize_duration(config.warning_threshold_ms)
            .unwrap_or(AggregatorConfig::default().warning_threshold_ms);

        Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(config.enabled),
                warning_threshold_ms: RwLock::new(threshold),
                state: Mutex::new(State::new(config.max_stored_metrics)),
                limiter: Mutex::new(RateLimiter::new(config.notification_window_ms)),
                subscribers: Arc::new(SubscriberRegistry::default()),
                scheduler,
                clock,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Turn recording on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
        debug!(enabled, "Performance metrics toggled");
    }

    /// Whether record operations are active
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Change the bound of each sample log, trimming them right away
    ///
    /// Zero is treated as one.
    pub fn set_max_stored_metrics(&self, max_stored_metrics: usize) {
        if max_stored_metrics == 0 {
            debug!("max_stored_metrics of 0 clamped to 1");
        }
        let mut state = self.inner.state.lock();
        state.network.set_capacity(max_stored_metrics);
        state.socket.set_capacity(max_stored_metrics);
        state.history.set_capacity(max_stored_metrics);
    }

    /// Bound applied to each sample log
    #[must_use]
    pub fn max_stored_metrics(&self) -> usize {
        self.inner.state.lock().network.capacity()
    }

    /// Change the slow-sample threshold (ms); negative or non-finite values are ignored
    pub fn set_performance_warning_threshold(&self, threshold_ms: f64) {
        if !threshold_ms.is_finite() || threshold_ms < 0.0 {
            debug!(threshold_ms, "Ignoring invalid performance warning threshold");
            return;
        }
        *self.inner.warning_threshold_ms.write() = threshold_ms;
    }

    /// Current slow-sample threshold (ms)
    #[must_use]
    pub fn performance_warning_threshold(&self) -> f64 {
        self.inner.threshold()
    }

    /// Change the notification throttle window (ms)
    pub fn set_notification_window_ms(&self, window_ms: u64) {
        self.inner.limiter.lock().set_window_ms(window_ms);
    }

    /// Current settings as a config value
    #[must_use]
    pub fn config(&self) -> AggregatorConfig {
        AggregatorConfig {
            enabled: self.is_enabled(),
            max_stored_metrics: self.max_stored_metrics(),
            warning_threshold_ms: self.performance_warning_threshold(),
            notification_window_ms: self.inner.limiter.lock().window_ms(),
        }
    }

    // ------------------------------------------------------------------
    // Write API
    // ------------------------------------------------------------------

    /// Record one render of `component_id`
    pub fn record_component_render(&self, component_id: &str, render_time_ms: f64) {
        if !self.is_enabled() {
            return;
        }
        let Some(render_time_ms) = sanitize_duration(render_time_ms) else {
            debug!(component_id, render_time_ms, "Dropping non-finite render time");
            return;
        };

        let now = self.inner.clock.now_millis();
        let tick = self.inner.clock.monotonic_millis();
        let wants_event = self
            .inner
            .subscribers
            .has_subscribers(EventType::ComponentRender);

        let (snapshot, needs_flush) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let row = stage(
                &mut state.pending_components,
                &state.components,
                component_id,
                || ComponentRenderStat::new(component_id),
            );
            row.stat.record(render_time_ms);
            let snapshot = wants_event.then(|| row.clone());

            state.history.push(RawMetricEvent {
                subject_name: component_id.to_string(),
                render_time_ms,
                data_processing_time_ms: 0.0,
                timestamp_ms: now,
            });
            (snapshot, state.mark_flush_scheduled())
        };

        if needs_flush {
            self.schedule_flush();
        }
        if let Some(row) = snapshot {
            self.inner.emit(tick, MetricEvent::ComponentRender(row));
        }

        let threshold = self.inner.threshold();
        if render_time_ms > threshold {
            if self
                .inner
                .try_fire(ThrottleKey::Notify(EventType::SlowRender), tick)
            {
                warn!(
                    component_id,
                    render_time_ms,
                    threshold_ms = threshold,
                    "Slow component render"
                );
                self.inner.subscribers.publish(&MetricEvent::SlowRender {
                    component_id: component_id.to_string(),
                    render_time_ms,
                    threshold_ms: threshold,
                });
            } else {
                trace!(component_id, render_time_ms, "Slow render notification throttled");
            }
        }
    }

    /// Record one run of `operation_id`; `data_size` replaces the stored size
    pub fn record_data_processing(
        &self,
        operation_id: &str,
        processing_time_ms: f64,
        data_size: u64,
    ) {
        self.record_processing(operation_id, processing_time_ms, data_size, true);
    }

    fn record_processing(
        &self,
        operation_id: &str,
        processing_time_ms: f64,
        data_size: u64,
        allow_notify: bool,
    ) {
        if !self.is_enabled() {
            return;
        }
        let Some(processing_time_ms) = sanitize_duration(processing_time_ms) else {
            debug!(operation_id, processing_time_ms, "Dropping non-finite processing time");
            return;
        };

        let now = self.inner.clock.now_millis();
        let tick = self.inner.clock.monotonic_millis();
        let wants_event = allow_notify
            && self
                .inner
                .subscribers
                .has_subscribers(EventType::DataProcessing);

        let (snapshot, needs_flush) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let row = stage(
                &mut state.pending_operations,
                &state.operations,
                operation_id,
                || OperationStat::new(operation_id),
            );
            row.stat.record(processing_time_ms);
            row.data_size = data_size;
            let snapshot = wants_event.then(|| row.clone());

            state.history.push(RawMetricEvent {
                subject_name: operation_id.to_string(),
                render_time_ms: 0.0,
                data_processing_time_ms: processing_time_ms,
                timestamp_ms: now,
            });
            (snapshot, state.mark_flush_scheduled())
        };

        if needs_flush {
            self.schedule_flush();
        }
        if let Some(row) = snapshot {
            self.inner.emit(tick, MetricEvent::DataProcessing(row));
        }

        let threshold = self.inner.threshold();
        if processing_time_ms > threshold
            && self
                .inner
                .try_fire(ThrottleKey::Notify(EventType::SlowDataProcessing), tick)
        {
            warn!(
                operation_id,
                processing_time_ms,
                data_size,
                threshold_ms = threshold,
                "Slow data processing"
            );
            if allow_notify {
                self.inner.subscribers.publish(&MetricEvent::SlowDataProcessing {
                    operation_id: operation_id.to_string(),
                    processing_time_ms,
                    threshold_ms: threshold,
                });
            }
        }
    }

    /// Time `work` and record it against `operation_id`
    ///
    /// The timing is recorded however `work` ends: normal return, an `Err`
    /// value, or a panic. The return value passes through untouched and a
    /// panic keeps unwinding with its original payload.
    pub fn measure_data_processing<T, F>(&self, operation_id: &str, data_size: u64, work: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = TimingGuard::start(self, operation_id, data_size);
        work()
    }

    /// Async counterpart of [`Self::measure_data_processing`]
    ///
    /// If the future is dropped before completing, the time until the drop
    /// is recorded.
    pub async fn measure_data_processing_async<T, F>(
        &self,
        operation_id: &str,
        data_size: u64,
        work: F,
    ) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = TimingGuard::start(self, operation_id, data_size);
        work.await
    }

    /// Append a network sample
    pub fn record_network_sample(&self, mut sample: NetworkSample) {
        if !self.is_enabled() {
            return;
        }
        let Some(response_time_ms) = sanitize_duration(sample.response_time_ms) else {
            debug!(url = %sample.url, "Dropping network sample with non-finite response time");
            return;
        };
        sample.response_time_ms = response_time_ms;

        let tick = self.inner.clock.monotonic_millis();
        let threshold = self.inner.threshold() * NETWORK_THRESHOLD_FACTOR;
        if response_time_ms > threshold
            && self
                .inner
                .try_fire(ThrottleKey::SlowWarning(EventType::NetworkRequest), tick)
        {
            warn!(
                url = %sample.url,
                method = %sample.method,
                status_code = sample.status_code,
                response_time_ms,
                threshold_ms = threshold,
                "Slow network request"
            );
        }

        let event = self
            .inner
            .subscribers
            .has_subscribers(EventType::NetworkRequest)
            .then(|| MetricEvent::NetworkRequest(sample.clone()));
        self.inner.state.lock().network.push(sample);

        if let Some(event) = event {
            self.inner.emit(tick, event);
        }
    }

    /// Append a socket message sample
    pub fn record_socket_sample(&self, mut sample: SocketMessageSample) {
        if !self.is_enabled() {
            return;
        }
        let Some(processing_time_ms) = sanitize_duration(sample.processing_time_ms) else {
            debug!(
                message_type = %sample.message_type,
                "Dropping socket sample with non-finite processing time"
            );
            return;
        };
        sample.processing_time_ms = processing_time_ms;

        let tick = self.inner.clock.monotonic_millis();
        let threshold = self.inner.threshold();
        if processing_time_ms > threshold
            && self
                .inner
                .try_fire(ThrottleKey::SlowWarning(EventType::SocketMessage), tick)
        {
            warn!(
                message_type = %sample.message_type,
                message_size_bytes = sample.message_size_bytes,
                processing_time_ms,
                threshold_ms = threshold,
                "Slow socket message processing"
            );
        }

        let event = self
            .inner
            .subscribers
            .has_subscribers(EventType::SocketMessage)
            .then(|| MetricEvent::SocketMessage(sample.clone()));
        self.inner.state.lock().socket.push(sample);

        if let Some(event) = event {
            self.inner.emit(tick, event);
        }
    }

    // ------------------------------------------------------------------
    // Read API
    // ------------------------------------------------------------------

    /// All component rows, in first-recorded order
    #[must_use]
    pub fn get_component_stats(&self) -> Vec<ComponentRenderStat> {
        self.inner
            .lock_flushed()
            .components
            .values()
            .cloned()
            .collect()
    }

    /// Row for one component
    #[must_use]
    pub fn get_component_stat(&self, component_id: &str) -> Option<ComponentRenderStat> {
        self.inner
            .lock_flushed()
            .components
            .get(component_id)
            .cloned()
    }

    /// All operation rows, in first-recorded order
    #[must_use]
    pub fn get_operation_stats(&self) -> Vec<OperationStat> {
        self.inner
            .lock_flushed()
            .operations
            .values()
            .cloned()
            .collect()
    }

    /// Row for one operation
    #[must_use]
    pub fn get_operation_stat(&self, operation_id: &str) -> Option<OperationStat> {
        self.inner
            .lock_flushed()
            .operations
            .get(operation_id)
            .cloned()
    }

    /// Stored network samples, oldest first, optionally filtered by URL substring
    #[must_use]
    pub fn get_network_samples(&self, url_contains: Option<&str>) -> Vec<NetworkSample> {
        self.inner
            .state
            .lock()
            .network
            .iter()
            .filter(|s| url_contains.is_none_or(|needle| s.url.contains(needle)))
            .cloned()
            .collect()
    }

    /// Stored socket samples, oldest first, optionally filtered by message type
    #[must_use]
    pub fn get_socket_samples(&self, message_type: Option<&str>) -> Vec<SocketMessageSample> {
        self.inner
            .state
            .lock()
            .socket
            .iter()
            .filter(|s| message_type.is_none_or(|kind| s.message_type == kind))
            .cloned()
            .collect()
    }

    /// Raw history, oldest first
    #[must_use]
    pub fn raw_events(&self) -> Vec<RawMetricEvent> {
        self.inner.state.lock().history.iter().cloned().collect()
    }

    /// Rankings and domain-wide figures
    #[must_use]
    pub fn get_summary(&self) -> PerformanceSummary {
        let state = self.inner.lock_flushed();

        let (render_total, render_count) = state
            .components
            .values()
            .fold((0.0, 0u64), |(total, count), row| {
                (total + row.stat.total_value, count + row.stat.count)
            });
        let (processing_total, processing_count) = state
            .operations
            .values()
            .fold((0.0, 0u64), |(total, count), row| {
                (total + row.stat.total_value, count + row.stat.count)
            });
        let network_total: f64 = state.network.iter().map(|s| s.response_time_ms).sum();
        let socket_total: f64 = state.socket.iter().map(|s| s.processing_time_ms).sum();

        let mut network_outcomes = RequestOutcomes::default();
        for sample in state.network.iter() {
            if sample.is_success() {
                network_outcomes.successes += 1;
            } else {
                network_outcomes.failures += 1;
            }
        }

        PerformanceSummary {
            slowest_components: top_n(state.components.values().collect(), |row| {
                row.stat.average_value
            }),
            slowest_operations: top_n(state.operations.values().collect(), |row| {
                row.stat.average_value
            }),
            slowest_network_requests: top_n(state.network.iter().collect(), |s| {
                s.response_time_ms
            }),
            slowest_socket_messages: top_n(state.socket.iter().collect(), |s| {
                s.processing_time_ms
            }),
            totals: SummaryTotals {
                total_render_time_ms: render_total,
                average_render_time_ms: mean(render_total, render_count),
                total_processing_time_ms: processing_total,
                average_processing_time_ms: mean(processing_total, processing_count),
                // SAFETY: usize to u64, log length is bounded by configuration
                average_network_time_ms: mean(network_total, state.network.len() as u64),
                average_socket_processing_time_ms: mean(socket_total, state.socket.len() as u64),
            },
            network_outcomes,
            recorded_events: state.history.len(),
        }
    }

    /// Rows waiting for the next flush
    #[must_use]
    pub fn pending_updates(&self) -> usize {
        let state = self.inner.state.lock();
        state.pending_components.len() + state.pending_operations.len()
    }

    /// Move pending rows into the live maps now, returning how many moved
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    // ------------------------------------------------------------------
    // Maintenance and eventing
    // ------------------------------------------------------------------

    /// Empty every collection and the pending buffer
    ///
    /// The enabled flag, thresholds and subscribers are left alone.
    pub fn clear_all(&self) {
        self.inner.state.lock().clear();
        debug!("Cleared all performance metrics");
    }

    /// Register `callback` on `event_type`
    pub fn subscribe<F>(&self, event_type: EventType, callback: F) -> Subscription
    where
        F: Fn(&MetricEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(event_type, callback)
    }

    /// Number of callbacks registered on `event_type`
    #[must_use]
    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.inner.subscribers.subscriber_count(event_type)
    }

    fn schedule_flush(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush();
            }
        });

        let scheduled = catch_unwind(AssertUnwindSafe(|| {
            self.inner.scheduler.schedule_idle(task);
        }));
        if scheduled.is_err() {
            error!("Idle scheduler failed, flushing inline");
            self.inner.flush();
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsAggregator")
            .field("config", &self.config())
            .field("pending_updates", &self.pending_updates())
            .finish_non_exhaustive()
    }
}

/// Records elapsed time against an operation when dropped
struct TimingGuard<'a> {
    aggregator: &'a MetricsAggregator,
    operation_id: &'a str,
    data_size: u64,
    started: Instant,
}

impl<'a> TimingGuard<'a> {
    fn start(aggregator: &'a MetricsAggregator, operation_id: &'a str, data_size: u64) -> Self {
        Self {
            aggregator,
            operation_id,
            data_size,
            started: Instant::now(),
        }
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        // Subscribers are skipped while unwinding so a faulty callback cannot
        // turn the original panic into an abort
        let allow_notify = !std::thread::panicking();
        self.aggregator
            .record_processing(self.operation_id, elapsed_ms, self.data_size, allow_notify);
    }
}
