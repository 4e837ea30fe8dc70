//! Time source used for sample timestamps and notification throttling
//!
//! Timestamps come from the wall clock. Throttle windows are measured on a
//! monotonic tick so a wall-clock step backwards cannot silence notifications.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Millisecond clock
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;

    /// Milliseconds from an arbitrary origin, never decreasing
    fn monotonic_millis(&self) -> u64;
}

/// System wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            // SAFETY: u128 to u64 - milliseconds since epoch fits in u64
            .as_millis() as u64
    }

    fn monotonic_millis(&self) -> u64 {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let origin = *ORIGIN.get_or_init(Instant::now);
        // SAFETY: u128 to u64 - process uptime in ms fits in u64
        origin.elapsed().as_millis() as u64
    }
}

/// Clock advanced by hand, for tests and replay
///
/// Both readings share one counter; `set` may move it backwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at `start_ms`
    #[must_use]
    pub const fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    /// Jump to an absolute time
    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    fn monotonic_millis(&self) -> u64 {
        self.now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(50);
        assert_eq!(clock.now_millis(), 1_050);
        clock.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_system_clock_is_past_epoch() {
        assert!(SystemClock.now_millis() > 0);
    }

    #[test]
    fn test_system_monotonic_never_decreases() {
        let first = SystemClock.monotonic_millis();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = SystemClock.monotonic_millis();
        assert!(second >= first + 5);
    }
}
