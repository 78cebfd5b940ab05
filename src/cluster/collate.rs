//! Reconciliation of per-member results into one report.

use crate::types::{ShardResult, TransferDirection};
use std::time::{Duration, Instant};

/// Sorted results of one distributed export or import of one dataset.
#[derive(Debug, Clone)]
pub struct Collation {
    pub results: Vec<ShardResult>,
    pub records_written: u64,
    pub elapsed: Duration,
}

impl Collation {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

/// Sort by (host, member[, file]) and total the records written.
///
/// Each file stays separate; nothing is merged beyond the sum.
pub fn collate(direction: TransferDirection, mut results: Vec<ShardResult>, started: Instant) -> Collation {
    results.sort_by(ShardResult::report_order);
    let records_written = results.iter().map(|r| r.records_written).sum();
    let elapsed = started.elapsed();

    for result in &results {
        let line = format!(
            "host,{},server,{},directory,{},file,{}",
            result.host, result.member, result.file_dir, result.file_name
        );
        match direction {
            TransferDirection::Import => tracing::info!(records = result.records_written, "{}", line),
            TransferDirection::Export => tracing::debug!(records = result.records_written, "{}", line),
        }
    }

    tracing::info!(
        direction = %direction,
        files = results.len(),
        records = records_written,
        elapsed_ms = elapsed.as_millis() as u64,
        "Parallel {} complete",
        direction
    );

    Collation {
        results,
        records_written,
        elapsed,
    }
}
