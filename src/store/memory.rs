//! In-memory store implementations.
//!
//! [`ShardedRegion`] hashes keys onto members the way a partitioned store
//! places them. A handle bound to one member enumerates only that member's
//! keys but reads and writes any key, forwarding to the owner.

use super::{KeyScope, Region, RegionKind, RegionService};
use crate::codec::Value;
use crate::dataset::SEPARATOR;
use crate::error::{Error, Result};
use crate::types::MemberName;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use twox_hash::XxHash64;

/// Default seed for key placement.
pub const DEFAULT_HASH_SEED: u64 = 0x5ADE_5EED;

/// A dataset held in a single map.
#[derive(Debug)]
pub struct MemoryRegion {
    name: String,
    kind: RegionKind,
    entries: DashMap<Value, Value>,
}

impl MemoryRegion {
    /// Create an empty replicated dataset.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, RegionKind::Replicated)
    }

    pub fn with_kind(name: impl Into<String>, kind: RegionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            entries: DashMap::new(),
        }
    }

    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Sorted copy of the contents.
    pub fn snapshot(&self) -> BTreeMap<Value, Value> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl Region for MemoryRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> RegionKind {
        self.kind
    }

    async fn key_set(&self, _scope: KeyScope) -> Result<Vec<Value>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }

    async fn get_all(&self, keys: &[Value]) -> Result<Vec<(Value, Option<Value>)>> {
        Ok(keys
            .iter()
            .map(|k| (k.clone(), self.entries.get(k).map(|v| v.value().clone())))
            .collect())
    }

    async fn put_all(&self, entries: Vec<(Value, Value)>) -> Result<()> {
        for (k, v) in entries {
            self.entries.insert(k, v);
        }
        Ok(())
    }
}

/// Shard maps shared by every handle to one partitioned dataset.
#[derive(Debug)]
struct ShardSet {
    members: Vec<MemberName>,
    shards: Vec<DashMap<Value, Value>>,
    hash_seed: u64,
    forwarded: AtomicU64,
}

impl ShardSet {
    fn owner_of(&self, key: &Value) -> usize {
        let mut hasher = XxHash64::with_seed(self.hash_seed);
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }
}

/// A partitioned dataset spread over a fixed set of members.
#[derive(Debug, Clone)]
pub struct ShardedRegion {
    name: String,
    shards: Arc<ShardSet>,
    local: Option<usize>,
}

impl ShardedRegion {
    /// Create an empty dataset partitioned over `members`.
    pub fn new(name: impl Into<String>, members: &[MemberName]) -> Result<Self> {
        Self::with_seed(name, members, DEFAULT_HASH_SEED)
    }

    pub fn with_seed(name: impl Into<String>, members: &[MemberName], hash_seed: u64) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::Config(
                "a partitioned dataset needs at least one member".into(),
            ));
        }

        let shards = ShardSet {
            members: members.to_vec(),
            shards: members.iter().map(|_| DashMap::new()).collect(),
            hash_seed,
            forwarded: AtomicU64::new(0),
        };

        Ok(Self {
            name: name.into(),
            shards: Arc::new(shards),
            local: None,
        })
    }

    /// A handle as seen from inside `member`. `None` if it hosts no shard.
    pub fn member_view(&self, member: &str) -> Option<ShardedRegion> {
        let index = self
            .shards
            .members
            .iter()
            .position(|m| m.eq_ignore_ascii_case(member))?;

        Some(Self {
            name: self.name.clone(),
            shards: Arc::clone(&self.shards),
            local: Some(index),
        })
    }

    /// Member that owns `key`.
    pub fn owner_of(&self, key: &Value) -> &str {
        &self.shards.members[self.shards.owner_of(key)]
    }

    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let shard = self.shards.owner_of(&key);
        self.shards.shards[shard].insert(key, value.into());
    }

    pub fn len(&self) -> usize {
        self.shards.shards.iter().map(DashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries held by each member.
    pub fn shard_sizes(&self) -> HashMap<MemberName, usize> {
        self.shards
            .members
            .iter()
            .cloned()
            .zip(self.shards.shards.iter().map(DashMap::len))
            .collect()
    }

    /// Writes that arrived at a member that does not own the key.
    pub fn forwarded_writes(&self) -> u64 {
        self.shards.forwarded.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        for shard in &self.shards.shards {
            shard.clear();
        }
    }

    /// Sorted copy of the contents of every shard.
    pub fn snapshot(&self) -> BTreeMap<Value, Value> {
        self.shards
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn all_keys(&self) -> Vec<Value> {
        self.shards
            .shards
            .iter()
            .flat_map(|shard| shard.iter().map(|e| e.key().clone()).collect::<Vec<_>>())
            .collect()
    }
}

#[async_trait::async_trait]
impl Region for ShardedRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> RegionKind {
        RegionKind::Partitioned
    }

    async fn key_set(&self, scope: KeyScope) -> Result<Vec<Value>> {
        match (scope, self.local) {
            (KeyScope::Local, Some(index)) => Ok(self.shards.shards[index]
                .iter()
                .map(|e| e.key().clone())
                .collect()),
            _ => Ok(self.all_keys()),
        }
    }

    async fn get_all(&self, keys: &[Value]) -> Result<Vec<(Value, Option<Value>)>> {
        Ok(keys
            .iter()
            .map(|k| {
                let shard = self.shards.owner_of(k);
                let value = self.shards.shards[shard].get(k).map(|v| v.value().clone());
                (k.clone(), value)
            })
            .collect())
    }

    async fn put_all(&self, entries: Vec<(Value, Value)>) -> Result<()> {
        let mut forwarded = 0u64;
        for (k, v) in entries {
            let shard = self.shards.owner_of(&k);
            if self.local.map_or(false, |local| local != shard) {
                forwarded += 1;
            }
            self.shards.shards[shard].insert(k, v);
        }

        if forwarded > 0 {
            self.shards.forwarded.fetch_add(forwarded, Ordering::Relaxed);
            tracing::trace!(region = %self.name, forwarded, "Forwarded writes to owning members");
        }
        Ok(())
    }
}

/// Root datasets reachable from one process.
#[derive(Debug, Default)]
pub struct MemoryService {
    regions: RwLock<BTreeMap<String, Arc<dyn Region>>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under its own name.
    pub fn add_region(&self, region: Arc<dyn Region>) {
        self.regions.write().insert(region.name().to_string(), region);
    }

    /// Create and register an empty replicated dataset.
    pub fn create_region(&self, name: &str) -> Arc<MemoryRegion> {
        let region = Arc::new(MemoryRegion::new(name));
        self.add_region(region.clone());
        region
    }
}

impl RegionService for MemoryService {
    fn regions(&self) -> Vec<String> {
        self.regions.read().keys().cloned().collect()
    }

    fn region(&self, name: &str) -> Option<Arc<dyn Region>> {
        let name = name.strip_prefix(SEPARATOR).unwrap_or(name);
        self.regions.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<MemberName> {
        vec!["server1".into(), "server2".into(), "server3".into()]
    }

    #[tokio::test]
    async fn test_member_views_partition_the_key_set() {
        let region = ShardedRegion::new("orders", &members()).unwrap();
        for i in 0..300i64 {
            region.insert(i, format!("v{}", i));
        }

        let mut total = 0;
        for member in members() {
            let view = region.member_view(&member).unwrap();
            let keys = view.key_set(KeyScope::Local).await.unwrap();
            for key in &keys {
                assert_eq!(region.owner_of(key), member);
            }
            total += keys.len();
        }
        assert_eq!(total, 300);

        let all = region.key_set(KeyScope::Server).await.unwrap();
        assert_eq!(all.len(), 300);
    }

    #[tokio::test]
    async fn test_misrouted_writes_are_forwarded() {
        let region = ShardedRegion::new("orders", &members()).unwrap();
        let view = region.member_view("server1").unwrap();

        let entries: Vec<_> = (0..30).map(|i| (Value::Int(i), Value::Int(i * 2))).collect();
        view.put_all(entries).await.unwrap();

        assert_eq!(region.len(), 30);
        let owned_by_server1 = region.shard_sizes()["server1"] as u64;
        assert_eq!(region.forwarded_writes(), 30 - owned_by_server1);

        let fetched = region.member_view("server2").unwrap().get_all(&[Value::Int(4)]).await.unwrap();
        assert_eq!(fetched, vec![(Value::Int(4), Some(Value::Int(8)))]);
    }

    #[tokio::test]
    async fn test_get_all_reports_missing_keys() {
        let region = MemoryRegion::new("customers");
        region.insert(1i64, "a");

        let fetched = region
            .get_all(&[Value::Int(1), Value::Int(2)])
            .await
            .unwrap();
        assert_eq!(
            fetched,
            vec![(Value::Int(1), Some(Value::from("a"))), (Value::Int(2), None)]
        );
    }

    #[test]
    fn test_service_lookup() {
        let service = MemoryService::new();
        service.create_region("orders");
        assert!(service.region("/orders").is_some());
        assert!(service.region("orders").is_some());
        assert!(service.region("missing").is_none());
        assert_eq!(service.regions(), vec!["orders"]);
        assert_eq!(service.region("orders").unwrap().full_path(), "/orders");
    }

    #[test]
    fn test_empty_member_list_rejected() {
        assert!(matches!(ShardedRegion::new("orders", &[]), Err(Error::Config(_))));
        let region = ShardedRegion::new("orders", &members()).unwrap();
        assert!(region.member_view("server9").is_none());
    }
}
