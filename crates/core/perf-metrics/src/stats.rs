//! Running statistics for one keyed series

use serde::{Deserialize, Serialize};

/// Running aggregate for one key
///
/// Totals and counts are kept raw; the average is re-derived from them on
/// every update so repeated updates never accumulate rounding drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    /// Number of samples recorded
    pub count: u64,
    /// Most recent sample (ms)
    pub last_value: f64,
    /// Smallest sample seen (ms)
    pub min_value: f64,
    /// Largest sample seen (ms)
    pub max_value: f64,
    /// Sum of all samples (ms)
    pub total_value: f64,
    /// `total_value / count`, zero when empty
    pub average_value: f64,
}

impl StatRow {
    /// Empty row
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            last_value: 0.0,
            min_value: 0.0,
            max_value: 0.0,
            total_value: 0.0,
            average_value: 0.0,
        }
    }

    /// Fold one sample into the row
    pub fn record(&mut self, value: f64) {
        if self.count == 0 {
            self.min_value = value;
            self.max_value = value;
        } else {
            self.min_value = self.min_value.min(value);
            self.max_value = self.max_value.max(value);
        }
        self.count += 1;
        self.last_value = value;
        self.total_value += value;
        // SAFETY: u64 to f64 for average calculation
        self.average_value = self.total_value / self.count as f64;
    }

    /// Whether any sample was recorded
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_row_is_all_zero() {
        let row = StatRow::new();
        assert!(row.is_empty());
        assert_eq!(row, StatRow::default());
        assert_eq!(row.max_value, 0.0);
        assert_eq!(row.average_value, 0.0);
    }

    #[test]
    fn test_record_updates_all_fields() {
        let mut row = StatRow::new();
        row.record(10.0);
        row.record(25.0);
        row.record(5.0);

        assert_eq!(row.count, 3);
        assert_eq!(row.last_value, 5.0);
        assert_eq!(row.max_value, 25.0);
        assert_eq!(row.min_value, 5.0);
        assert_eq!(row.total_value, 40.0);
        assert!((row.average_value - 40.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_sample_sets_min_and_max() {
        let mut row = StatRow::new();
        row.record(7.5);
        assert_eq!(row.min_value, 7.5);
        assert_eq!(row.max_value, 7.5);
        assert_eq!(row.average_value, 7.5);
    }
}
