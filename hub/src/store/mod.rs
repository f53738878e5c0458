//! Persistence boundary
//!
//! The hub issues exactly three operations against an external store -
//! insert, list, delete over byte-string keys within named buckets - and
//! stays agnostic to the engine behind them (embedded KV store, relational
//! table, ...). [`PipeBucket`] layers the pipe serialization on top of that
//! narrow contract.

mod memory;

pub use memory::MemoryStore;

use crate::pipe::Pipe;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Default bucket name for pipe records
pub const PIPES_BUCKET: &str = "pipes";

/// Error at the store boundary, propagated verbatim to callers
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backing engine failed
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Generic bucket store contract
///
/// Implementations must be thread-safe; the hub shares one store across
/// every bucket wrapper. Values are opaque bytes - the store never
/// interprets them.
pub trait Store: Send + Sync {
    /// Insert or replace the value under `key` in `bucket`
    fn insert(&self, bucket: &str, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    /// All values in `bucket`, in store-defined order
    fn list(&self, bucket: &str) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Remove the value under `key`; absent keys are a no-op
    fn delete(&self, bucket: &str, key: &[u8]) -> Result<(), StoreError>;
}

/// Pipe records in a bucket, keyed by uri
///
/// `create_or_update` is an idempotent upsert: writing the same uri twice
/// leaves exactly one record holding the latest value. The bucket performs
/// no cascading deletion of referenced listener/endpoint instances - those
/// lifecycles belong to the registry.
pub struct PipeBucket {
    store: Arc<dyn Store>,
    bucket: String,
}

impl PipeBucket {
    /// Wrap a store using the default pipes bucket
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_bucket(store, PIPES_BUCKET)
    }

    /// Wrap a store using a custom bucket name
    pub fn with_bucket(store: Arc<dyn Store>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Serialize and write the pipe under key = its uri
    pub fn create_or_update(&self, pipe: &Pipe) -> Result<(), StoreError> {
        let value =
            serde_json::to_vec(pipe).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.insert(&self.bucket, pipe.uri.as_bytes(), value)?;
        debug!(uri = %pipe.uri, "pipe record written");
        Ok(())
    }

    /// All persisted pipes, in store-defined order
    pub fn list(&self) -> Result<Vec<Pipe>, StoreError> {
        self.store
            .list(&self.bucket)?
            .iter()
            .map(|raw| {
                serde_json::from_slice(raw).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Look up one pipe by uri, for management surfaces
    pub fn get(&self, uri: &str) -> Result<Option<Pipe>, StoreError> {
        Ok(self.list()?.into_iter().find(|p| p.uri == uri))
    }

    /// Remove the record under the uri; absent uris are a no-op
    pub fn delete(&self, uri: &str) -> Result<(), StoreError> {
        self.store.delete(&self.bucket, uri.as_bytes())?;
        debug!(uri = %uri, "pipe record deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipe::{EntityRef, Profile};
    use crate::script::Script;

    fn bucket() -> PipeBucket {
        PipeBucket::new(Arc::new(MemoryStore::new()))
    }

    fn pipe(uri: &str, profile_name: &str) -> Pipe {
        Pipe::new(
            uri,
            EntityRef::new("mqtt-main", "mqtt").with_config("broker", "tcp://localhost"),
            [EntityRef::new("stdout-1", "stdout")],
            Profile {
                uid: format!("{profile_name}-uid"),
                name: profile_name.to_string(),
                description: String::new(),
                version: "1".to_string(),
                script: Script::default(),
            },
        )
    }

    #[test]
    fn create_then_list_round_trips_all_fields() {
        let bucket = bucket();
        let original = pipe("/a", "first");
        bucket.create_or_update(&original).unwrap();

        let listed = bucket.list().unwrap();
        assert_eq!(listed, vec![original]);
    }

    #[test]
    fn upsert_same_uri_keeps_one_record_with_latest_profile() {
        let bucket = bucket();
        bucket.create_or_update(&pipe("/a", "first")).unwrap();
        bucket.create_or_update(&pipe("/a", "second")).unwrap();

        let listed = bucket.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].profile.name, "second");
    }

    #[test]
    fn distinct_uris_coexist() {
        let bucket = bucket();
        bucket.create_or_update(&pipe("/a", "a")).unwrap();
        bucket.create_or_update(&pipe("/b", "b")).unwrap();
        assert_eq!(bucket.list().unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_by_key() {
        let bucket = bucket();
        bucket.create_or_update(&pipe("/a", "a")).unwrap();
        bucket.create_or_update(&pipe("/b", "b")).unwrap();

        bucket.delete("/a").unwrap();

        let listed = bucket.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|p| p.uri != "/a"));
    }

    #[test]
    fn delete_absent_is_a_no_op() {
        let bucket = bucket();
        bucket.delete("/never-existed").unwrap();
        assert!(bucket.list().unwrap().is_empty());
    }

    #[test]
    fn get_finds_by_uri() {
        let bucket = bucket();
        bucket.create_or_update(&pipe("/a", "a")).unwrap();

        assert_eq!(bucket.get("/a").unwrap().unwrap().profile.name, "a");
        assert!(bucket.get("/b").unwrap().is_none());
    }

    #[test]
    fn garbage_in_the_bucket_is_a_serialization_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(PIPES_BUCKET, b"/bad", b"not json".to_vec())
            .unwrap();

        let bucket = PipeBucket::new(store);
        assert!(matches!(
            bucket.list().unwrap_err(),
            StoreError::Serialization(_)
        ));
    }
}
