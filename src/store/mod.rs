//! Interfaces to the key/value store holding the datasets.
//!
//! The store owns storage, partitioning and routing. The transfer engine
//! only needs key enumeration, bulk reads and bulk overwrites, all of which
//! may cross the network inside the store.

pub mod memory;

use crate::codec::Value;
use crate::dataset;
use crate::error::Result;
use std::fmt::Debug;
use std::sync::Arc;

pub use memory::{MemoryRegion, MemoryService, ShardedRegion};

/// How a dataset is laid out across members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Keys are split between members; each member is primary for a subset.
    Partitioned,
    /// Every member holds every key.
    Replicated,
}

/// Which keys an enumeration returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// All keys, as seen by the authoritative store.
    Server,
    /// Keys resident in this process: the primary-owned portion of a
    /// partitioned dataset, everything for a replicated one.
    Local,
}

/// One dataset as seen from the current process.
#[async_trait::async_trait]
pub trait Region: Send + Sync + Debug {
    /// Dataset name without the leading separator.
    fn name(&self) -> &str;

    /// Full path, e.g. `/orders`.
    fn full_path(&self) -> String {
        dataset::full_path(self.name())
    }

    fn kind(&self) -> RegionKind;

    /// Enumerate keys. Iteration order is store-defined.
    async fn key_set(&self, scope: KeyScope) -> Result<Vec<Value>>;

    /// Fetch values for a batch of keys in one round trip.
    ///
    /// A key removed since enumeration comes back with `None`.
    async fn get_all(&self, keys: &[Value]) -> Result<Vec<(Value, Option<Value>)>>;

    /// Store a batch of entries, unconditionally overwriting existing values.
    async fn put_all(&self, entries: Vec<(Value, Value)>) -> Result<()>;
}

/// Access to the root datasets of the store.
pub trait RegionService: Send + Sync + Debug {
    /// Names of all root datasets, reserved ones included.
    fn regions(&self) -> Vec<String>;

    /// Look up a dataset by name, with or without the leading separator.
    fn region(&self, name: &str) -> Option<Arc<dyn Region>>;
}
