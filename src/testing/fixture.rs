//! In-process cluster fixture.

use crate::cluster::{DistributedTransfer, FunctionHandler, InProcessInvoker, RemoteInvoker};
use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::metrics::TransferMetrics;
use crate::session::TransferSession;
use crate::store::{MemoryRegion, MemoryService, Region, RegionService, ShardedRegion};
use crate::transfer::{LocalTransfer, Role};
use crate::types::{MemberInfo, MemberName};
use std::sync::Arc;

/// A fixed set of members sharing datasets through in-memory stores.
///
/// Members alternate between two hosts so reports sort on both keys.
#[derive(Debug)]
pub struct TestCluster {
    members: Vec<MemberInfo>,
    member_services: Vec<Arc<MemoryService>>,
    client_service: Arc<MemoryService>,
    invoker: Arc<InProcessInvoker>,
    metrics: Arc<TransferMetrics>,
    config: TransferConfig,
}

impl TestCluster {
    pub fn new(member_count: usize, config: TransferConfig) -> Result<Self> {
        if member_count == 0 {
            return Err(Error::Config("a test cluster needs at least one member".into()));
        }

        let members: Vec<MemberInfo> = (0..member_count)
            .map(|i| MemberInfo::new(format!("server{}", i + 1), format!("host-{}", (i + 1) % 2)))
            .collect();

        let metrics = Arc::new(TransferMetrics::new());
        let invoker = Arc::new(InProcessInvoker::new());
        let mut member_services = Vec::with_capacity(member_count);

        for member in &members {
            let service = Arc::new(MemoryService::new());
            let regions: Arc<dyn RegionService> = service.clone();
            let handler = FunctionHandler::new(member.clone(), regions, config.clone())
                .with_metrics(Arc::clone(&metrics));
            invoker.register(Arc::new(handler));
            member_services.push(service);
        }

        Ok(Self {
            members,
            member_services,
            client_service: Arc::new(MemoryService::new()),
            invoker,
            metrics,
            config,
        })
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    pub fn member_names(&self) -> Vec<MemberName> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<TransferMetrics> {
        &self.metrics
    }

    pub fn invoker(&self) -> &Arc<InProcessInvoker> {
        &self.invoker
    }

    /// Create a dataset partitioned across every member.
    pub fn add_partitioned(&self, name: &str) -> Result<ShardedRegion> {
        let region = ShardedRegion::new(name, &self.member_names())?;

        for (member, service) in self.members.iter().zip(&self.member_services) {
            let view = region
                .member_view(&member.name)
                .ok_or_else(|| Error::Internal(format!("no shard for {}", member.name)))?;
            service.add_region(Arc::new(view));
        }
        self.client_service.add_region(Arc::new(region.clone()));
        Ok(region)
    }

    /// Create a dataset every member holds in full.
    pub fn add_replicated(&self, name: &str) -> Arc<MemoryRegion> {
        let region = Arc::new(MemoryRegion::new(name));
        for service in &self.member_services {
            service.add_region(region.clone() as Arc<dyn Region>);
        }
        self.client_service.add_region(region.clone());
        region
    }

    /// Create a dataset visible to the client only.
    pub fn add_client_only(&self, name: &str) -> Arc<MemoryRegion> {
        self.client_service.create_region(name)
    }

    /// Session that runs every operation on the hosting members.
    pub fn distributed_session(&self) -> TransferSession {
        let invoker: Arc<dyn RemoteInvoker> = self.invoker.clone();
        TransferSession::new(
            self.client_service.clone(),
            Arc::new(DistributedTransfer::new(invoker)),
        )
    }

    /// Session that runs every operation in the client process.
    pub fn client_session(&self) -> TransferSession {
        let transfer = LocalTransfer::new(Role::Client, self.config.clone())
            .with_metrics(Arc::clone(&self.metrics));
        TransferSession::new(self.client_service.clone(), Arc::new(transfer))
    }
}
