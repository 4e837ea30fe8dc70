//! Notification events and the subscriber registry

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::error;

use crate::types::{ComponentRenderStat, NetworkSample, OperationStat, SocketMessageSample};

/// Notification channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    /// A component render was recorded
    ComponentRender,
    /// A data-processing sample was recorded
    DataProcessing,
    /// A network sample was recorded
    NetworkRequest,
    /// A socket message sample was recorded
    SocketMessage,
    /// A render exceeded the warning threshold
    SlowRender,
    /// A data-processing sample exceeded the warning threshold
    SlowDataProcessing,
}

impl EventType {
    /// Every channel
    pub const ALL: [Self; 6] = [
        Self::ComponentRender,
        Self::DataProcessing,
        Self::NetworkRequest,
        Self::SocketMessage,
        Self::SlowRender,
        Self::SlowDataProcessing,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ComponentRender => "componentRender",
            Self::DataProcessing => "dataProcessing",
            Self::NetworkRequest => "networkRequest",
            Self::SocketMessage => "socketMessage",
            Self::SlowRender => "slowRender",
            Self::SlowDataProcessing => "slowDataProcessing",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MetricEvent {
    /// Updated render row
    ComponentRender(ComponentRenderStat),
    /// Updated operation row
    DataProcessing(OperationStat),
    /// Recorded network sample
    NetworkRequest(NetworkSample),
    /// Recorded socket sample
    SocketMessage(SocketMessageSample),
    /// Render over threshold
    SlowRender {
        /// Component identifier
        component_id: String,
        /// Offending render time (ms)
        render_time_ms: f64,
        /// Threshold in force (ms)
        threshold_ms: f64,
    },
    /// Processing over threshold
    SlowDataProcessing {
        /// Operation identifier
        operation_id: String,
        /// Offending processing time (ms)
        processing_time_ms: f64,
        /// Threshold in force (ms)
        threshold_ms: f64,
    },
}

impl MetricEvent {
    /// Channel this event is published on
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::ComponentRender(_) => EventType::ComponentRender,
            Self::DataProcessing(_) => EventType::DataProcessing,
            Self::NetworkRequest(_) => EventType::NetworkRequest,
            Self::SocketMessage(_) => EventType::SocketMessage,
            Self::SlowRender { .. } => EventType::SlowRender,
            Self::SlowDataProcessing { .. } => EventType::SlowDataProcessing,
        }
    }
}

type Callback = Arc<dyn Fn(&MetricEvent) + Send + Sync>;

/// Callbacks by channel
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: RwLock<FxHashMap<EventType, Vec<(u64, Callback)>>>,
}

impl SubscriberRegistry {
    pub(crate) fn subscribe<F>(self: &Arc<Self>, event_type: EventType, callback: F) -> Subscription
    where
        F: Fn(&MetricEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            registry: Arc::downgrade(self),
            event_type,
            id,
        }
    }

    fn remove(&self, event_type: EventType, id: u64) {
        let mut subscribers = self.subscribers.write();
        if let Some(callbacks) = subscribers.get_mut(&event_type) {
            callbacks.retain(|(existing, _)| *existing != id);
            if callbacks.is_empty() {
                subscribers.remove(&event_type);
            }
        }
    }

    pub(crate) fn has_subscribers(&self, event_type: EventType) -> bool {
        self.subscribers.read().contains_key(&event_type)
    }

    pub(crate) fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscribers.read().get(&event_type).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its channel
    ///
    /// Callbacks run without the registry lock held. A panicking callback is
    /// logged and skipped; the rest still run.
    pub(crate) fn publish(&self, event: &MetricEvent) {
        let event_type = event.event_type();
        let callbacks: Vec<Callback> = match self.subscribers.read().get(&event_type) {
            Some(callbacks) => callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return,
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(event_type = %event_type, "Metrics subscriber panicked");
            }
        }
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        let counts: FxHashMap<EventType, usize> =
            subscribers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &counts)
            .finish()
    }
}

/// Handle returned by `subscribe`
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    event_type: EventType,
    id: u64,
}

impl Subscription {
    /// Channel this subscription listens on
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Remove exactly this callback. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.event_type, self.id);
        }
    }
}
