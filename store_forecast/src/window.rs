//! Fixed-size trailing window over a store's sales series
//!
//! The window only ever holds values observed *before* the row currently
//! being featurized: callers read lags and rolling slices first, then push the
//! current row's value. That ordering is what keeps every derived statistic
//! causal.

use crate::error::{ForecastError, Result};
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Trailing window of the most recent series values, newest last
///
/// A `None` entry marks a row whose sales value is unknown; any statistic that
/// needs it is undefined.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    capacity: usize,
    values: VecDeque<Option<f64>>,
}

impl TrailingWindow {
    /// Create a window remembering the last `capacity` values
    pub fn new(capacity: usize) -> Result<Self> {
        NonZeroUsize::new(capacity)
            .map(Self::with_capacity)
            .ok_or_else(|| {
                ForecastError::InvalidParameter(
                    "Window capacity must be greater than zero".to_string(),
                )
            })
    }

    /// Create a window whose capacity is known to be non-zero
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            values: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Record the value of the row just featurized
    pub fn push(&mut self, value: Option<f64>) {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Value `k` steps back (`k = 1` is the previous row)
    pub fn lag(&self, k: usize) -> Option<f64> {
        if k == 0 || k > self.values.len() {
            return None;
        }
        self.values[self.values.len() - k]
    }

    /// The `n` most recent values, oldest first, if all are known
    pub fn recent(&self, n: usize) -> Option<Vec<f64>> {
        if n == 0 || n > self.values.len() {
            return None;
        }
        self.values.iter().skip(self.values.len() - n).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the window when moving on to another store
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lags_follow_push_order() {
        let mut window = TrailingWindow::new(3).unwrap();
        assert_eq!(window.lag(1), None);

        for v in [100.0, 110.0, 105.0, 120.0] {
            window.push(Some(v));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.lag(1), Some(120.0));
        assert_eq!(window.lag(3), Some(110.0));
        assert_eq!(window.lag(4), None);
        assert_eq!(window.recent(2), Some(vec![105.0, 120.0]));
    }

    #[test]
    fn test_unknown_values_poison_dependent_statistics() {
        let mut window = TrailingWindow::new(3).unwrap();
        window.push(Some(1.0));
        window.push(None);
        window.push(Some(3.0));

        assert_eq!(window.lag(1), Some(3.0));
        assert_eq!(window.lag(2), None);
        assert_eq!(window.recent(1), Some(vec![3.0]));
        assert_eq!(window.recent(2), None);
    }

    #[test]
    fn test_reset_and_zero_capacity() {
        let mut window = TrailingWindow::new(2).unwrap();
        window.push(Some(5.0));
        window.reset();
        assert!(window.is_empty());

        assert!(TrailingWindow::new(0).is_err());
    }
}
