//! In-memory store for testing and single-node deployments

use super::{Store, StoreError};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// In-memory [`Store`]: buckets of key-ordered byte maps
///
/// Listing returns values in key order, which keeps tests deterministic;
/// callers must not rely on it - the contract promises no ordering.
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records in a bucket
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, |b| b.len())
    }

    /// Whether a bucket has no records
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn insert(&self, bucket: &str, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_vec(), value);
        Ok(())
    }

    fn list(&self, bucket: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), StoreError> {
        if let Some(bucket) = self.buckets.write().get_mut(bucket) {
            bucket.remove(key);
        }
        Ok(())
    }
}
