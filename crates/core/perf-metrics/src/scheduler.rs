//! Idle-time task scheduling port
//!
//! The aggregator defers batch flushes to whatever "idle slot" the host
//! offers. Hosts pick an adapter:
//! - [`ImmediateScheduler`] runs the task inline (backend default)
//! - [`ManualScheduler`] queues tasks until the host drains them
//! - [`TokioScheduler`] spawns the task on a tokio runtime after a yield

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{MetricsError, Result};

/// Deferred unit of work
pub type IdleTask = Box<dyn FnOnce() + Send + 'static>;

/// Host-provided idle scheduler
pub trait Scheduler: Send + Sync {
    /// Run `task` at the next idle opportunity
    fn schedule_idle(&self, task: IdleTask);
}

/// Runs every task synchronously on the caller's thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule_idle(&self, task: IdleTask) {
        task();
    }
}

/// Queues tasks until [`ManualScheduler::run_pending`] is called
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<IdleTask>>,
}

impl ManualScheduler {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run every queued task, returning how many ran
    ///
    /// Tasks queued while draining run on the next call.
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.lock());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_idle(&self, task: IdleTask) {
        self.queue.lock().push(task);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Spawns tasks on a tokio runtime once the current task yields
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Bind to an explicit runtime handle
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running on
    ///
    /// # Errors
    /// Returns [`MetricsError::SchedulerUnavailable`] outside a tokio runtime
    pub fn current() -> Result<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| MetricsError::SchedulerUnavailable(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_idle(&self, task: IdleTask) {
        debug!("Scheduling idle flush on tokio runtime");
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: &Arc<AtomicUsize>) -> IdleTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_immediate_runs_inline() {
        let counter = Arc::new(AtomicUsize::new(0));
        ImmediateScheduler.schedule_idle(counting_task(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_defers_until_drained() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_idle(counting_task(&counter));
        scheduler.schedule_idle(counting_task(&counter));
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_tokio_current_outside_runtime_fails() {
        assert!(matches!(
            TokioScheduler::current(),
            Err(MetricsError::SchedulerUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_runs_task() {
        let scheduler = TokioScheduler::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.schedule_idle(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }
}
