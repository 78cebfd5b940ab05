//! Monotonic counters.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing count.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    value: AtomicU64,
}

impl Counter {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counts keyed by a fixed number of label values, e.g. `[direction, outcome]`.
#[derive(Debug)]
pub struct LabeledCounter<const N: usize> {
    name: &'static str,
    values: RwLock<HashMap<[String; N], u64>>,
}

impl<const N: usize> LabeledCounter<N> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inc(&self, labels: [&str; N]) {
        let key = labels.map(str::to_string);
        *self.values.write().entry(key).or_insert(0) += 1;
    }

    pub fn get(&self, labels: [&str; N]) -> u64 {
        let key = labels.map(str::to_string);
        self.values.read().get(&key).copied().unwrap_or(0)
    }
}
