//! Member-side execution of broadcast transfer functions.

use super::messages::{FunctionResult, Invocation, MemberReply, TransferFunction};
use crate::codec::ValueCodec;
use crate::config::TransferConfig;
use crate::error::{Error, RemoteExecutionError, Result};
use crate::metrics::TransferMetrics;
use crate::store::{Region, RegionService};
use crate::transfer::{LocalTransfer, Role};
use crate::types::{now_millis, ImportRequest, MemberInfo, ShardResult};
use std::sync::Arc;
use std::time::Duration;

/// The requests addressed to `member`. Matching ignores case.
pub fn select_requests(member: &MemberInfo, requests: &[ImportRequest]) -> Vec<ImportRequest> {
    requests
        .iter()
        .filter(|request| request.is_for(member))
        .cloned()
        .collect()
}

/// How far `local_ms` is from `timestamp`, when that exceeds `tolerance`.
pub fn clock_skew(local_ms: u64, timestamp: u64, tolerance: Duration) -> Option<u64> {
    let skew = local_ms.abs_diff(timestamp);
    (skew > tolerance.as_millis() as u64).then_some(skew)
}

/// Runs transfer functions on one member against its local datasets.
#[derive(Debug)]
pub struct FunctionHandler {
    member: MemberInfo,
    service: Arc<dyn RegionService>,
    transfer: LocalTransfer,
}

impl FunctionHandler {
    pub fn new(member: MemberInfo, service: Arc<dyn RegionService>, config: TransferConfig) -> Self {
        let transfer = LocalTransfer::new(Role::Member(member.clone()), config);
        Self {
            member,
            service,
            transfer,
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.transfer = self.transfer.with_codec(codec);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<TransferMetrics>) -> Self {
        self.transfer = self.transfer.with_metrics(metrics);
        self
    }

    pub fn member(&self) -> &MemberInfo {
        &self.member
    }

    /// Whether this member holds (part of) `region`.
    pub fn hosts(&self, region: &str) -> bool {
        self.service.region(region).is_some()
    }

    /// Execute an invocation. Failures come back in transport-safe form.
    pub async fn handle(&self, invocation: &Invocation) -> MemberReply {
        tracing::debug!(
            invocation = %invocation.id,
            member = %self.member.name,
            function = invocation.function.name(),
            region = %invocation.region,
            "Executing transfer function"
        );

        self.execute(invocation).await.map_err(|e| {
            tracing::error!(
                invocation = %invocation.id,
                member = %self.member.name,
                error = %e,
                "Transfer function failed"
            );
            RemoteExecutionError::capture(self.member.name.clone(), &e)
        })
    }

    async fn execute(&self, invocation: &Invocation) -> Result<FunctionResult> {
        let region = self
            .service
            .region(&invocation.region)
            .ok_or_else(|| Error::DatasetNotFound(invocation.region.clone()))?;

        match &invocation.function {
            TransferFunction::ParallelExport { timestamp } => {
                self.check_clock_skew(*timestamp);
                let result = self.transfer.export_region(region.as_ref(), *timestamp).await;
                Ok(FunctionResult::Exported(result))
            }
            TransferFunction::ParallelImport { requests } => {
                let results = self.import_selected(region.as_ref(), requests).await;
                Ok(FunctionResult::Imported(results))
            }
        }
    }

    async fn import_selected(&self, region: &dyn Region, requests: &[ImportRequest]) -> Vec<ShardResult> {
        let mine = select_requests(&self.member, requests);
        tracing::debug!(
            member = %self.member.name,
            region = %region.full_path(),
            offered = requests.len(),
            selected = mine.len(),
            "Selected import files"
        );

        let mut results = Vec::with_capacity(mine.len());
        for request in &mine {
            results.push(self.transfer.import_file(region, request).await);
        }
        results
    }

    fn check_clock_skew(&self, timestamp: u64) {
        let now = now_millis();
        if let Some(skew) = clock_skew(now, timestamp, self.transfer.config().clock_skew_tolerance) {
            tracing::warn!(
                member = %self.member.name,
                local_ms = now,
                coordinator_ms = timestamp,
                skew_ms = skew,
                "Member clock differs from coordinating timestamp"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryService;
    use tempfile::tempdir;

    fn request(member: Option<&str>, file_name: &str) -> ImportRequest {
        ImportRequest {
            member: member.map(str::to_string),
            file_dir: String::new(),
            file_name: file_name.to_string(),
            region: "orders".into(),
        }
    }

    #[test]
    fn test_select_requests_filters_by_member() {
        let member = MemberInfo::new("server1", "host-a");
        let requests = vec![
            request(Some("server1"), "orders.server1.1.adp"),
            request(Some("SERVER1"), "orders.server1.2.adp"),
            request(Some("server2"), "orders.server2.1.adp"),
            request(None, "orders.1.adp"),
        ];

        let mine = select_requests(&member, &requests);
        let names: Vec<_> = mine.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["orders.server1.1.adp", "orders.server1.2.adp"]);
    }

    #[tokio::test]
    async fn test_missing_region_is_remote_error() {
        let handler = FunctionHandler::new(
            MemberInfo::new("server1", "host-a"),
            Arc::new(MemoryService::new()),
            TransferConfig::new(),
        );
        assert!(!handler.hosts("orders"));

        let invocation = Invocation::new("orders", TransferFunction::ParallelExport { timestamp: now_millis() });
        let err = handler.handle(&invocation).await.unwrap_err();
        assert_eq!(err.member, "server1");
        assert!(err.message.contains("orders"));
    }

    #[test]
    fn test_clock_skew_beyond_tolerance() {
        let tolerance = Duration::from_secs(1);
        assert_eq!(clock_skew(10_000, 10_000, tolerance), None);
        assert_eq!(clock_skew(10_000, 9_000, tolerance), None);
        assert_eq!(clock_skew(10_000, 11_001, tolerance), Some(1_001));
        assert_eq!(clock_skew(10_000, 5, tolerance), Some(9_995));
    }

    #[tokio::test]
    async fn test_export_with_skewed_clock_still_runs() {
        let dir = tempdir().unwrap();
        let service = Arc::new(MemoryService::new());
        service.create_region("orders").insert(1i64, "x");

        let handler = FunctionHandler::new(
            MemberInfo::new("server1", "host-a"),
            service,
            TransferConfig::new().with_export_dir(dir.path()),
        );

        let invocation = Invocation::new("orders", TransferFunction::ParallelExport { timestamp: 5 });
        let results = handler.handle(&invocation).await.unwrap().into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name, "orders.server1.5.adp");
        assert_eq!(results[0].records_written, 1);
        assert!(clock_skew(now_millis(), 5, handler.transfer.config().clock_skew_tolerance).is_some());
    }
}
