//! Transfer activity metrics.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   TransferMetrics                     │
//! │  ┌──────────────────────┐  ┌───────────────────────┐ │
//! │  │ Counters             │  │ Histograms            │ │
//! │  │ - files by direction │  │ - transfer seconds    │ │
//! │  │   and outcome        │  │ - batch size          │ │
//! │  │ - records, batches   │  │                       │ │
//! │  └──────────────────────┘  └───────────────────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```

mod counters;
mod histograms;

pub use counters::{Counter, LabeledCounter};
pub use histograms::{
    Histogram, HistogramSnapshot, BATCH_SIZE_BUCKETS, TRANSFER_SECONDS_BUCKETS,
};

use crate::types::{ShardResult, TransferDirection};
use std::time::Duration;

/// Metrics shared by every transfer run in a process.
#[derive(Debug)]
pub struct TransferMetrics {
    /// Files processed, labelled `[direction, outcome]`.
    pub files: LabeledCounter<2>,
    pub records_exported: Counter,
    pub records_imported: Counter,
    /// Bulk fetches and bulk puts issued.
    pub batches: Counter,
    pub transfer_seconds: Histogram,
    pub batch_size: Histogram,
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferMetrics {
    pub fn new() -> Self {
        Self {
            files: LabeledCounter::new("adp_files_total"),
            records_exported: Counter::new("adp_records_exported_total"),
            records_imported: Counter::new("adp_records_imported_total"),
            batches: Counter::new("adp_batches_total"),
            transfer_seconds: Histogram::new("adp_transfer_seconds", TRANSFER_SECONDS_BUCKETS),
            batch_size: Histogram::new("adp_batch_size", BATCH_SIZE_BUCKETS),
        }
    }

    /// Record one bulk fetch or bulk put.
    pub fn record_batch(&self, entries: usize) {
        self.batches.inc();
        self.batch_size.observe(entries as f64);
    }

    /// Record a finished file, successful or not.
    pub fn record_result(&self, result: &ShardResult, elapsed: Duration) {
        let outcome = if result.is_success() { "ok" } else { "failed" };
        let direction = result.direction.to_string();
        self.files.inc([direction.as_str(), outcome]);

        match result.direction {
            TransferDirection::Export => self.records_exported.inc_by(result.records_written),
            TransferDirection::Import => self.records_imported.inc_by(result.records_written),
        }
        self.transfer_seconds.observe_duration(elapsed);
    }

    pub fn snapshot(&self) -> TransferMetricsSnapshot {
        TransferMetricsSnapshot {
            exports_ok: self.files.get(["export", "ok"]),
            exports_failed: self.files.get(["export", "failed"]),
            imports_ok: self.files.get(["import", "ok"]),
            imports_failed: self.files.get(["import", "failed"]),
            records_exported: self.records_exported.get(),
            records_imported: self.records_imported.get(),
            batches: self.batches.get(),
            transfer_seconds: self.transfer_seconds.snapshot(),
        }
    }
}

/// Point-in-time copy of [`TransferMetrics`].
#[derive(Debug, Clone)]
pub struct TransferMetricsSnapshot {
    pub exports_ok: u64,
    pub exports_failed: u64,
    pub imports_ok: u64,
    pub imports_failed: u64,
    pub records_exported: u64,
    pub records_imported: u64,
    pub batches: u64,
    pub transfer_seconds: HistogramSnapshot,
}

impl TransferMetricsSnapshot {
    pub fn failures(&self) -> u64 {
        self.exports_failed + self.imports_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_results() {
        let metrics = TransferMetrics::new();

        let mut export = ShardResult::new(TransferDirection::Export, "/orders");
        export.records_written = 10;
        metrics.record_result(&export, Duration::from_millis(5));

        let mut failed = ShardResult::new(TransferDirection::Import, "/orders");
        failed.error = Some("missing header".into());
        metrics.record_result(&failed, Duration::from_millis(1));

        metrics.record_batch(10);

        let snap = metrics.snapshot();
        assert_eq!(snap.exports_ok, 1);
        assert_eq!(snap.imports_failed, 1);
        assert_eq!(snap.failures(), 1);
        assert_eq!(snap.records_exported, 10);
        assert_eq!(snap.records_imported, 0);
        assert_eq!(snap.batches, 1);
        assert_eq!(snap.transfer_seconds.count, 2);
    }
}
