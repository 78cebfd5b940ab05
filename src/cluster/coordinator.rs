//! Distributed export and import.

use super::collate::collate;
use super::invoker::RemoteInvoker;
use super::messages::{FunctionResult, Invocation, MemberReply, TransferFunction};
use crate::dataset;
use crate::error::{Error, Result};
use crate::store::Region;
use crate::transfer::DataTransfer;
use crate::types::{ImportRequest, MemberInfo, ShardResult, TransferDirection};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Runs each export or import once on every member hosting the dataset.
///
/// Export broadcasts a shared timestamp; every member writes its own file.
/// Import broadcasts the full request list for the dataset and each member
/// picks the files addressed to it.
#[derive(Debug, Clone)]
pub struct DistributedTransfer {
    invoker: Arc<dyn RemoteInvoker>,
}

impl DistributedTransfer {
    pub fn new(invoker: Arc<dyn RemoteInvoker>) -> Self {
        Self { invoker }
    }

    /// Members the next broadcast for `region` would reach.
    pub fn members_hosting(&self, region: &str) -> Vec<MemberInfo> {
        self.invoker.members_hosting(region)
    }

    async fn run(&self, invocation: Invocation, expected: TransferDirection) -> Result<Vec<ShardResult>> {
        let region_path = dataset::full_path(&invocation.region);
        let replies = self.invoker.broadcast(invocation).await?;
        gather(&region_path, replies, expected)
    }
}

/// Flatten member replies.
///
/// A member whose invocation failed is reported as a failed result of its
/// own, so the files written by the other members stay in the report.
fn gather(
    region_path: &str,
    replies: Vec<(MemberInfo, MemberReply)>,
    expected: TransferDirection,
) -> Result<Vec<ShardResult>> {
    let mut results = Vec::new();

    for (member, reply) in replies {
        match reply {
            Ok(FunctionResult::Exported(result)) if expected == TransferDirection::Export => {
                results.push(result)
            }
            Ok(FunctionResult::Imported(batch)) if expected == TransferDirection::Import => {
                results.extend(batch)
            }
            Ok(other) => {
                return Err(Error::Internal(format!(
                    "member '{}' answered a {} with {:?}",
                    member.name, expected, other
                )))
            }
            Err(remote) => {
                tracing::error!(
                    member = %member.name,
                    host = %member.host,
                    region = %region_path,
                    error = %remote,
                    "Member invocation failed"
                );
                let mut failed = ShardResult::new(expected, region_path).with_member(Some(&member));
                failed.error = Some(remote.to_string());
                results.push(failed);
            }
        }
    }

    Ok(results)
}

/// Paths of requested files that no member reported on.
///
/// A request addressed to a member whose invocation failed counts as
/// reported; that failure is already in the results.
fn unclaimed_files(requests: &[ImportRequest], results: &[ShardResult]) -> Vec<String> {
    let claimed: HashSet<_> = results
        .iter()
        .map(|r| (r.file_dir.as_str(), r.file_name.as_str()))
        .collect();
    let failed_members: Vec<&str> = results
        .iter()
        .filter(|r| !r.is_success() && r.file_name.is_empty())
        .map(|r| r.member.as_str())
        .collect();

    requests
        .iter()
        .filter(|r| !claimed.contains(&(r.file_dir.as_str(), r.file_name.as_str())))
        .filter(|r| {
            !r.member
                .as_deref()
                .is_some_and(|m| failed_members.iter().any(|f| f.eq_ignore_ascii_case(m)))
        })
        .map(|r| r.path().display().to_string())
        .collect()
}

fn reconcile(region: &str, requests: &[ImportRequest], results: &[ShardResult]) {
    let unclaimed = unclaimed_files(requests, results);
    if !unclaimed.is_empty() {
        tracing::warn!(
            region = %region,
            requested = requests.len(),
            claimed = requests.len() - unclaimed.len(),
            files = ?unclaimed,
            "Import files not claimed by any member"
        );
    }
}

#[async_trait::async_trait]
impl DataTransfer for DistributedTransfer {
    async fn export(&self, region: &dyn Region, timestamp: u64) -> Result<Vec<ShardResult>> {
        let started = Instant::now();
        let invocation = Invocation::new(region.name(), TransferFunction::ParallelExport { timestamp });
        let results = self.run(invocation, TransferDirection::Export).await?;
        Ok(collate(TransferDirection::Export, results, started).results)
    }

    async fn import(
        &self,
        region: &dyn Region,
        requests: Vec<ImportRequest>,
    ) -> Result<Vec<ShardResult>> {
        let started = Instant::now();
        let invocation = Invocation::new(
            region.name(),
            TransferFunction::ParallelImport {
                requests: requests.clone(),
            },
        );
        let results = self.run(invocation, TransferDirection::Import).await?;
        reconcile(&region.full_path(), &requests, &results);
        Ok(collate(TransferDirection::Import, results, started).results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteExecutionError;
    use crate::session::TransferSession;
    use crate::store::MemoryService;

    fn member(name: &str) -> MemberInfo {
        MemberInfo::new(name, "localhost")
    }

    fn exported(name: &str, records: u64) -> ShardResult {
        let mut result = ShardResult::new(TransferDirection::Export, "/orders").with_member(Some(&member(name)));
        result.file_name = format!("orders.{}.1.adp", name);
        result.records_written = records;
        result
    }

    /// Answers every broadcast with the same canned replies.
    #[derive(Debug)]
    struct CannedInvoker {
        replies: Vec<(MemberInfo, MemberReply)>,
    }

    #[async_trait::async_trait]
    impl RemoteInvoker for CannedInvoker {
        fn members_hosting(&self, _region: &str) -> Vec<MemberInfo> {
            self.replies.iter().map(|(m, _)| m.clone()).collect()
        }

        async fn broadcast(&self, _invocation: Invocation) -> Result<Vec<(MemberInfo, MemberReply)>> {
            Ok(self.replies.clone())
        }
    }

    #[test]
    fn test_gather_flattens_imports() {
        let replies = vec![
            (
                member("server1"),
                Ok(FunctionResult::Imported(vec![
                    ShardResult::new(TransferDirection::Import, "/orders"),
                    ShardResult::new(TransferDirection::Import, "/orders"),
                ])),
            ),
            (member("server2"), Ok(FunctionResult::Imported(vec![]))),
        ];
        assert_eq!(gather("/orders", replies, TransferDirection::Import).unwrap().len(), 2);
    }

    #[test]
    fn test_gather_keeps_results_beside_member_failure() {
        let replies = vec![
            (member("server1"), Ok(FunctionResult::Exported(exported("server1", 500)))),
            (
                member("server2"),
                Err(RemoteExecutionError::new("server2", "disk full")),
            ),
        ];

        let results = gather("/orders", replies, TransferDirection::Export).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert_eq!(results[0].records_written, 500);

        let failed = &results[1];
        assert_eq!(failed.member, "server2");
        assert_eq!(failed.region_path, "/orders");
        assert!(failed.error.as_deref().unwrap().contains("disk full"));
    }

    #[test]
    fn test_gather_rejects_mismatched_reply() {
        let replies = vec![(member("server1"), Ok(FunctionResult::Imported(vec![])))];
        assert!(matches!(
            gather("/orders", replies, TransferDirection::Export),
            Err(Error::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_run_reports_successes_and_failures() {
        let service = Arc::new(MemoryService::new());
        service.create_region("orders");

        let invoker = Arc::new(CannedInvoker {
            replies: vec![
                (member("server1"), Ok(FunctionResult::Exported(exported("server1", 500)))),
                (
                    member("server2"),
                    Err(RemoteExecutionError::new("server2", "disk full")),
                ),
            ],
        });
        let session = TransferSession::new(service, Arc::new(DistributedTransfer::new(invoker)));

        let summary = session.export(&["orders"]).await.unwrap();
        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.records_written(), 500);
        assert!(!summary.is_success());
    }

    fn request(member: Option<&str>, file_name: &str) -> ImportRequest {
        ImportRequest {
            member: member.map(str::to_string),
            file_dir: "/data".into(),
            file_name: file_name.into(),
            region: "orders".into(),
        }
    }

    #[test]
    fn test_unclaimed_files() {
        let requests = vec![
            request(Some("server1"), "orders.server1.1.adp"),
            request(Some("server2"), "orders.server2.1.adp"),
            request(Some("server9"), "orders.server9.1.adp"),
        ];

        let mut imported = ShardResult::new(TransferDirection::Import, "/orders")
            .with_member(Some(&member("server1")));
        imported.file_dir = "/data".into();
        imported.file_name = "orders.server1.1.adp".into();

        let mut failed = ShardResult::new(TransferDirection::Import, "/orders")
            .with_member(Some(&member("server2")));
        failed.error = Some("disk full".into());

        let unclaimed = unclaimed_files(&requests, &[imported, failed]);
        assert_eq!(unclaimed.len(), 1);
        assert!(unclaimed[0].ends_with("orders.server9.1.adp"));

        assert!(unclaimed_files(&requests[..1], &[]).len() == 1);
    }
}
