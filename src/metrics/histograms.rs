//! Bucketed histograms.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Buckets for whole-file transfer durations, in seconds.
pub const TRANSFER_SECONDS_BUCKETS: &[f64] = &[
    0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0,
];

/// Buckets for batch sizes, in entries.
pub const BATCH_SIZE_BUCKETS: &[f64] = &[1.0, 10.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0];

/// Cumulative histogram over fixed upper bounds.
#[derive(Debug)]
pub struct Histogram {
    name: &'static str,
    bounds: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum_bits: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(name: &'static str, bounds: &[f64]) -> Self {
        let mut bounds = bounds.to_vec();
        bounds.sort_by(f64::total_cmp);

        Self {
            name,
            counts: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
            bounds,
            sum_bits: AtomicU64::new(0f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        let mut current = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self.sum_bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        for (bound, count) in self.bounds.iter().zip(&self.counts) {
            if value <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn observe_duration(&self, duration: Duration) {
        self.observe(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        HistogramSnapshot {
            bounds: self.bounds.clone(),
            counts: self
                .counts
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            sum: f64::from_bits(self.sum_bits.load(Ordering::Relaxed)),
            count: self.count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub bounds: Vec<f64>,
    /// Observations at or below each bound.
    pub counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_buckets() {
        let h = Histogram::new("batch_size", BATCH_SIZE_BUCKETS);
        h.observe(7.0);
        h.observe(1000.0);
        h.observe(20000.0);

        let snap = h.snapshot();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.counts, vec![0, 1, 1, 1, 2, 2, 2]);
        assert!((snap.sum - 21007.0).abs() < 1e-9);
    }

    #[test]
    fn test_durations_recorded_in_seconds() {
        let h = Histogram::new("transfer_seconds", TRANSFER_SECONDS_BUCKETS);
        h.observe_duration(Duration::from_millis(250));
        let snap = h.snapshot();
        assert_eq!(snap.count, 1);
        assert!((snap.sum - 0.25).abs() < 1e-9);
        assert_eq!(snap.counts[..3], [0, 0, 0]);
        assert_eq!(snap.counts[3], 1);
    }
}
