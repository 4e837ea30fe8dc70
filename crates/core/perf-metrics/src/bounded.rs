//! Append-only sample log with oldest-first eviction

use std::collections::VecDeque;

/// Bounded FIFO log
///
/// Inserting past the bound drops the oldest entries immediately.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Create a log holding at most `capacity` entries (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest ones past the bound
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        self.trim();
    }

    /// Change the bound and trim right away
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.trim();
    }

    /// Current bound
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, keeping the bound
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_bound() {
        let mut log = BoundedLog::new(3);
        log.push(1);
        log.push(2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut log = BoundedLog::new(3);
        for i in 0..10 {
            log.push(i);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_shrinking_capacity_trims() {
        let mut log = BoundedLog::new(5);
        for i in 0..5 {
            log.push(i);
        }
        log.set_capacity(2);
        assert_eq!(log.capacity(), 2);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut log = BoundedLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.iter().copied().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut log = BoundedLog::new(4);
        log.push(1);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 4);
    }
}
