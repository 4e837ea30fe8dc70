//! Fixed-window notification throttle
//!
//! The first trigger in a window fires, everything else inside the window is
//! dropped. Nothing is queued or replayed later.

use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Default window between two notifications on the same channel
pub const DEFAULT_WINDOW_MS: u64 = 100;

/// Per-key fixed-window rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter<K> {
    window_ms: u64,
    last_fired: FxHashMap<K, u64>,
}

impl<K: Hash + Eq> RateLimiter<K> {
    /// Create a limiter with the given window
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_fired: FxHashMap::default(),
        }
    }

    /// Window length in milliseconds
    #[must_use]
    pub const fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Change the window; already recorded fire times are kept
    pub fn set_window_ms(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }

    /// Returns true when `key` may fire at `now_ms`, and records the fire
    pub fn try_acquire(&mut self, key: K, now_ms: u64) -> bool {
        match self.last_fired.get(&key) {
            Some(&last) if now_ms.saturating_sub(last) < self.window_ms => false,
            _ => {
                self.last_fired.insert(key, now_ms);
                true
            }
        }
    }
}

impl<K: Hash + Eq> Default for RateLimiter<K> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_fires() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.try_acquire("a", 1_000));
    }

    #[test]
    fn test_calls_inside_window_dropped() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.try_acquire("a", 1_000));
        assert!(!limiter.try_acquire("a", 1_050));
        assert!(!limiter.try_acquire("a", 1_099));
        assert!(limiter.try_acquire("a", 1_100));
    }

    #[test]
    fn test_dropped_calls_do_not_extend_window() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.try_acquire("a", 0));
        assert!(!limiter.try_acquire("a", 90));
        // Window is measured from the last fire, not the last attempt
        assert!(limiter.try_acquire("a", 100));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.try_acquire("a", 0));
        assert!(limiter.try_acquire("b", 10));
        assert!(!limiter.try_acquire("a", 20));
    }

    #[test]
    fn test_earlier_tick_is_throttled() {
        let mut limiter = RateLimiter::new(100);
        assert!(limiter.try_acquire(1u8, 500));
        assert!(!limiter.try_acquire(1u8, 400));
    }
}
