//! Export and import of whole datasets.
//!
//! [`TransferEngine`] moves entries between one dataset and one stream.
//! [`LocalTransfer`] drives it against files for the current process, and
//! the distributed coordinator in [`crate::cluster`] runs a `LocalTransfer`
//! on every member hosting a dataset.

mod engine;
mod local;

pub use engine::{TransferCounts, TransferEngine};
pub use local::{LocalTransfer, Role};

use crate::error::Result;
use crate::store::Region;
use crate::types::{ImportRequest, ShardResult};
use std::fmt::Debug;

/// Produces [`ShardResult`]s for exports and imports of one dataset.
#[async_trait::async_trait]
pub trait DataTransfer: Send + Sync + Debug {
    /// Export `region`, labelling files with `timestamp`.
    async fn export(&self, region: &dyn Region, timestamp: u64) -> Result<Vec<ShardResult>>;

    /// Import the files named by `requests` into `region`.
    async fn import(
        &self,
        region: &dyn Region,
        requests: Vec<ImportRequest>,
    ) -> Result<Vec<ShardResult>>;
}
