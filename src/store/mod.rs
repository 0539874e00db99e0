//! Key-value store adapters.
//!
//! The catalog talks to its record store through the [`KvStore`] trait: string keys,
//! byte values, existence-sensitive reads and cursor-driven prefix scans.
//!
//! # Implementations
//!
//! - [`RedisStore`] - the production adapter (`SET`/`GET`/`SCAN`).
//! - [`MemoryStore`] - an actor-backed in-memory store used by tests and the demo binary.
//!
//! # Scanning
//!
//! Catalogs can hold hundreds of thousands of records, so there is no "list all keys"
//! call. [`PrefixScan`] walks the keyspace in batches until the store reports cursor `0`.

pub mod memory;
pub mod redis_store;

pub use self::memory::{MemoryStore, MemoryStoreClient};
pub use self::redis_store::{RedisStore, SharedConnection};

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Default `COUNT` hint for a single scan step.
pub const DEFAULT_SCAN_BATCH: usize = 1000;

/// One step of a cursor scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanBatch {
    /// Cursor to pass to the next call. `0` means the scan is complete.
    pub cursor: u64,
    /// Keys found in this step. May be empty even when `cursor` is non-zero.
    pub keys: Vec<String>,
}

/// A single logical record store keyed by string.
///
/// A single `put` or `get` on one key is assumed atomic. No multi-key guarantees
/// are required.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Writes `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Reads the value under `key`. Absence is [`StoreError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Returns the next batch of keys starting with `prefix`.
    ///
    /// Start with cursor `0`; stop when the returned cursor is `0` again.
    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanBatch, StoreError>;

    /// Releases the underlying connection.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Restartable, finite walk over every key with a given prefix.
///
/// ```rust,ignore
/// let mut scan = PrefixScan::new(store.as_ref(), "product:", 1000);
/// while let Some(keys) = scan.next_batch().await? {
///     for key in keys { /* ... */ }
/// }
/// ```
pub struct PrefixScan<'a> {
    store: &'a dyn KvStore,
    prefix: String,
    count: usize,
    cursor: u64,
    finished: bool,
}

impl<'a> PrefixScan<'a> {
    pub fn new(store: &'a dyn KvStore, prefix: impl Into<String>, count: usize) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            count: count.max(1),
            cursor: 0,
            finished: false,
        }
    }

    /// Fetches the next batch, or `None` once the store has returned cursor `0`.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<String>>, StoreError> {
        if self.finished {
            return Ok(None);
        }
        let batch = self.store.scan(&self.prefix, self.cursor, self.count).await?;
        self.cursor = batch.cursor;
        if self.cursor == 0 {
            self.finished = true;
        }
        Ok(Some(batch.keys))
    }

    /// Rewinds to the beginning of the keyspace.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.finished = false;
    }

    /// Drains the scan into a sorted, de-duplicated key set.
    ///
    /// Stores may return a key more than once during a scan; the set absorbs repeats.
    pub async fn collect_keys(mut self) -> Result<BTreeSet<String>, StoreError> {
        let mut keys = BTreeSet::new();
        while let Some(batch) = self.next_batch().await? {
            keys.extend(batch);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Store that replays scripted scan batches.
    struct ScriptedScan {
        batches: Mutex<Vec<ScanBatch>>,
        calls: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl KvStore for ScriptedScan {
        async fn put(&self, _key: &str, _value: Vec<u8>) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }

        async fn scan(&self, _prefix: &str, cursor: u64, _count: usize) -> Result<ScanBatch, StoreError> {
            self.calls.lock().unwrap().push(cursor);
            Ok(self.batches.lock().unwrap().remove(0))
        }

        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn batch(cursor: u64, keys: &[&str]) -> ScanBatch {
        ScanBatch {
            cursor,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_scan_follows_cursor_until_zero_and_dedups() {
        let store = ScriptedScan {
            batches: Mutex::new(vec![
                batch(17, &["product:b", "product:a"]),
                batch(4, &[]),
                batch(0, &["product:a", "product:c"]),
            ]),
            calls: Mutex::new(Vec::new()),
        };

        let keys = PrefixScan::new(&store, "product:", 2).collect_keys().await.unwrap();

        let keys: Vec<_> = keys.into_iter().collect();
        assert_eq!(keys, vec!["product:a", "product:b", "product:c"]);
        assert_eq!(*store.calls.lock().unwrap(), vec![0, 17, 4]);
    }

    #[tokio::test]
    async fn test_restart_rewinds_cursor() {
        let store = ScriptedScan {
            batches: Mutex::new(vec![batch(0, &["product:a"]), batch(0, &["product:a"])]),
            calls: Mutex::new(Vec::new()),
        };

        let mut scan = PrefixScan::new(&store, "product:", 10);
        assert!(scan.next_batch().await.unwrap().is_some());
        assert!(scan.next_batch().await.unwrap().is_none());

        scan.restart();
        assert_eq!(scan.next_batch().await.unwrap(), Some(vec!["product:a".to_string()]));
        assert_eq!(*store.calls.lock().unwrap(), vec![0, 0]);
    }
}
