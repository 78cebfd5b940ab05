//! Run-level orchestration over many datasets or files.
//!
//! A failure in one dataset or one file is recorded and the run moves on.
//! The [`RunSummary`] tells the caller whether anything failed.

use crate::dataset::expand_patterns;
use crate::error::{Error, Result};
use crate::placement::{group_by_dataset, resolve_datasets, Placement};
use crate::store::RegionService;
use crate::transfer::DataTransfer;
use crate::types::{now_millis, ImportRequest, ShardResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Every file result, in the order reported.
    pub results: Vec<ShardResult>,

    /// Failures that produced no file result, e.g. a missing dataset.
    pub errors: Vec<(String, Error)>,

    pub elapsed: Duration,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded() + self.errors.len()
    }

    pub fn records_written(&self) -> u64 {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.records_written)
            .sum()
    }

    /// True when every item in the run succeeded.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn record_error(&mut self, item: &str, error: Error) {
        tracing::error!(item = %item, error = %error, "Transfer failed");
        self.errors.push((item.to_string(), error));
    }
}

/// Exports and imports through one [`DataTransfer`].
#[derive(Debug, Clone)]
pub struct TransferSession {
    service: Arc<dyn RegionService>,
    transfer: Arc<dyn DataTransfer>,
}

impl TransferSession {
    pub fn new(service: Arc<dyn RegionService>, transfer: Arc<dyn DataTransfer>) -> Self {
        Self { service, transfer }
    }

    /// Export every dataset selected by `patterns`.
    ///
    /// Fails outright only for a malformed pattern; everything after that is
    /// reported per dataset.
    pub async fn export<S: AsRef<str>>(&self, patterns: &[S]) -> Result<RunSummary> {
        let started = Instant::now();
        let timestamp = now_millis();
        let names = expand_patterns(patterns, &self.service.regions())?;
        let mut summary = RunSummary::default();

        tracing::info!(datasets = names.len(), timestamp, "Export begins");

        for name in &names {
            let Some(region) = self.service.region(name) else {
                summary.record_error(name, Error::DatasetNotFound(name.clone()));
                continue;
            };

            match self.transfer.export(region.as_ref(), timestamp).await {
                Ok(results) => summary.results.extend(results),
                Err(e) => summary.record_error(name, e),
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            files = summary.results.len(),
            failed = summary.failed(),
            records = summary.records_written(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Export ends"
        );
        Ok(summary)
    }

    /// Import `requests`, one dataset at a time.
    pub async fn import(&self, requests: Vec<ImportRequest>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        self.import_into(&mut summary, &requests).await;
        summary.elapsed = started.elapsed();
        log_import_end(&summary);
        summary
    }

    /// Import the requests of a [`Placement`], counting its rejected arguments as failures.
    pub async fn import_placement(&self, placement: Placement) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        for (arg, error) in placement.rejected {
            summary.record_error(&arg, error);
        }

        self.import_into(&mut summary, &placement.requests).await;
        summary.elapsed = started.elapsed();
        log_import_end(&summary);
        summary
    }

    async fn import_into(&self, summary: &mut RunSummary, requests: &[ImportRequest]) {
        tracing::info!(files = requests.len(), "Import begins");

        let requests = resolve_datasets(requests, self.service.as_ref());
        for (name, subset) in group_by_dataset(&requests) {
            let Some(region) = self.service.region(&name) else {
                summary.record_error(&name, Error::DatasetNotFound(name.clone()));
                continue;
            };

            match self.transfer.import(region.as_ref(), subset).await {
                Ok(results) => summary.results.extend(results),
                Err(e) => summary.record_error(&name, e),
            }
        }
    }
}

fn log_import_end(summary: &RunSummary) {
    tracing::info!(
        files = summary.results.len(),
        failed = summary.failed(),
        records = summary.records_written(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Import ends"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferConfig;
    use crate::placement::place_local_files;
    use crate::store::MemoryService;
    use crate::transfer::{LocalTransfer, Role};
    use tempfile::tempdir;

    fn session(service: Arc<MemoryService>, config: TransferConfig) -> TransferSession {
        TransferSession::new(service, Arc::new(LocalTransfer::new(Role::Client, config)))
    }

    #[tokio::test]
    async fn test_missing_dataset_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let service = Arc::new(MemoryService::new());
        service.create_region("orders").insert(1i64, "x");

        let session = session(service, TransferConfig::new().with_export_dir(dir.path()));
        let summary = session.export(&["missing", "orders"]).await.unwrap();

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert!(matches!(summary.errors[0].1, Error::DatasetNotFound(_)));
        assert_eq!(summary.records_written(), 1);
    }

    #[tokio::test]
    async fn test_reserved_literal_fails_the_run() {
        let service = Arc::new(MemoryService::new());
        service.create_region("__system");

        let session = session(service, TransferConfig::new());
        assert!(matches!(
            session.export(&["__system"]).await,
            Err(Error::Argument(_))
        ));
    }

    #[tokio::test]
    async fn test_local_round_trip_through_placement() {
        let dir = tempdir().unwrap();
        let service = Arc::new(MemoryService::new());
        let orders = service.create_region("orders");
        orders.insert(1i64, "x");
        orders.insert(2i64, "y");
        let customers = service.create_region("customers");
        customers.insert("c1", 10i64);

        let session = session(service, TransferConfig::new().with_export_dir(dir.path()));
        let exported = session.export(&["*"]).await.unwrap();
        assert!(exported.is_success());
        assert_eq!(exported.results.len(), 2);

        let expected_orders = orders.snapshot();
        orders.clear();
        customers.clear();

        let paths: Vec<String> = exported
            .results
            .iter()
            .map(|r| r.path().display().to_string())
            .collect();
        let mut placement = place_local_files(paths.as_slice());
        placement.requests.push(ImportRequest {
            member: None,
            file_dir: dir.path().display().to_string(),
            file_name: "unknown.1.adp".into(),
            region: "unknown".into(),
        });

        let imported = session.import_placement(placement).await;
        assert_eq!(imported.succeeded(), 2);
        assert_eq!(imported.failed(), 1);
        assert_eq!(orders.snapshot(), expected_orders);
        assert_eq!(customers.len(), 1);
    }
}
