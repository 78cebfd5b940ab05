//! Export and import against the datasets reachable from this process.

use super::engine::{TransferCounts, TransferEngine};
use super::DataTransfer;
use crate::codec::{BincodeCodec, ValueCodec};
use crate::config::TransferConfig;
use crate::error::Result;
use crate::format::ExportFileName;
use crate::metrics::TransferMetrics;
use crate::store::{KeyScope, Region};
use crate::types::{ImportRequest, MemberInfo, ShardResult, TransferDirection};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Who is running the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A process that hosts no data. Keys are enumerated through the store.
    Client,
    /// A dataset-hosting member. Keys are enumerated from its local portion.
    Member(MemberInfo),
}

impl Role {
    pub fn member(&self) -> Option<&MemberInfo> {
        match self {
            Role::Client => None,
            Role::Member(member) => Some(member),
        }
    }

    pub fn key_scope(&self) -> KeyScope {
        match self {
            Role::Client => KeyScope::Server,
            Role::Member(_) => KeyScope::Local,
        }
    }
}

/// Single-process export and import.
///
/// Failures are logged and recorded on the returned [`ShardResult`]; they
/// never escape, so a caller looping over datasets or files carries on.
#[derive(Debug, Clone)]
pub struct LocalTransfer {
    role: Role,
    config: TransferConfig,
    codec: Arc<dyn ValueCodec>,
    metrics: Arc<TransferMetrics>,
}

impl LocalTransfer {
    pub fn new(role: Role, config: TransferConfig) -> Self {
        Self {
            role,
            config,
            codec: Arc::new(BincodeCodec::new()),
            metrics: Arc::new(TransferMetrics::new()),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<TransferMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<TransferMetrics> {
        &self.metrics
    }

    fn engine(&self) -> TransferEngine {
        TransferEngine::new(Arc::clone(&self.codec), self.config.resolved_block_size())
            .with_metrics(Arc::clone(&self.metrics))
    }

    /// Export `region` to a new file in the configured export directory.
    pub async fn export_region(&self, region: &dyn Region, timestamp: u64) -> ShardResult {
        let member = self.role.member();
        let file_name = ExportFileName::new(
            region.name(),
            member.map(|m| m.name.as_str()),
            timestamp,
            self.config.file_type,
        );

        let mut result = ShardResult::new(TransferDirection::Export, region.full_path())
            .with_member(member);
        result.file_dir = self.config.export_dir.display().to_string();
        result.file_name = file_name.file_name();
        let path = result.path();

        tracing::info!(
            region = %result.region_path,
            file = %path.display(),
            "Export begins"
        );

        let started = Instant::now();
        let mut counts = TransferCounts::default();
        let outcome = self
            .export_to_file(region, &path, timestamp, &mut counts)
            .await;
        result.records_read = counts.records_read;
        result.records_written = counts.records_written;

        match outcome {
            Ok(()) => tracing::info!(
                region = %result.region_path,
                file = %path.display(),
                records = result.records_written,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Export ends"
            ),
            Err(e) => {
                tracing::error!(
                    region = %result.region_path,
                    file = %path.display(),
                    records = result.records_written,
                    error = %e,
                    "Export failed"
                );
                result.error = Some(e.to_string());
            }
        }

        self.metrics.record_result(&result, started.elapsed());
        result
    }

    /// Import one file into `region`.
    pub async fn import_file(&self, region: &dyn Region, request: &ImportRequest) -> ShardResult {
        let mut result = ShardResult::new(TransferDirection::Import, region.full_path())
            .with_member(self.role.member());
        result.file_dir = request.file_dir.clone();
        result.file_name = request.file_name.clone();
        let path = request.path();

        tracing::info!(
            region = %result.region_path,
            file = %path.display(),
            "Import begins"
        );

        let started = Instant::now();
        let mut counts = TransferCounts::default();
        let outcome = self.import_from_file(region, &path, &mut counts).await;
        result.records_read = counts.records_read;
        result.records_written = counts.records_written;

        match outcome {
            Ok(()) => tracing::info!(
                region = %result.region_path,
                file = %path.display(),
                records = result.records_written,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Import ends"
            ),
            Err(e) => {
                tracing::error!(
                    region = %result.region_path,
                    file = %path.display(),
                    records = result.records_written,
                    error = %e,
                    "Import failed"
                );
                result.error = Some(e.to_string());
            }
        }

        self.metrics.record_result(&result, started.elapsed());
        result
    }

    async fn export_to_file(
        &self,
        region: &dyn Region,
        path: &Path,
        timestamp: u64,
        counts: &mut TransferCounts,
    ) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        let file = self
            .engine()
            .export(region, self.role.key_scope(), file, timestamp, counts)
            .await?;
        file.get_ref().sync_all()?;
        Ok(())
    }

    async fn import_from_file(
        &self,
        region: &dyn Region,
        path: &Path,
        counts: &mut TransferCounts,
    ) -> Result<()> {
        let file = BufReader::new(File::open(path)?);
        self.engine().import(region, file, counts).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataTransfer for LocalTransfer {
    async fn export(&self, region: &dyn Region, timestamp: u64) -> Result<Vec<ShardResult>> {
        Ok(vec![self.export_region(region, timestamp).await])
    }

    async fn import(
        &self,
        region: &dyn Region,
        requests: Vec<ImportRequest>,
    ) -> Result<Vec<ShardResult>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in &requests {
            results.push(self.import_file(region, request).await);
        }
        Ok(results)
    }
}
