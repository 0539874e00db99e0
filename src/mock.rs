//! # Failure Injection
//!
//! Wrappers that forward to a real adapter until told to fail.
//!
//! ```rust,ignore
//! let (inner, _handle) = MemoryStore::spawn(16);
//! let store = Arc::new(FailingStore::new(Arc::new(inner)));
//! store.fail_reads_of("product:seed-2");
//! store.fail_writes_after(3);
//! ```

use crate::error::{IndexError, StoreError};
use crate::search::{IndexDocument, SearchHits, SearchIndex, SearchQuery};
use crate::store::{KvStore, ScanBatch};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn injected() -> StoreError {
    StoreError::Unavailable("injected failure".to_string())
}

#[derive(Default)]
struct StoreFaults {
    fail_all: bool,
    fail_scans: bool,
    fail_next_write: bool,
    writes_left: Option<usize>,
    failing_reads: HashSet<String>,
}

/// [`KvStore`] wrapper with switchable failures.
pub struct FailingStore {
    inner: Arc<dyn KvStore>,
    faults: Mutex<StoreFaults>,
    writes: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn KvStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(StoreFaults::default()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Every operation fails while set.
    pub fn set_fail_all(&self, fail: bool) {
        self.faults().fail_all = fail;
    }

    pub fn fail_scans(&self) {
        self.faults().fail_scans = true;
    }

    /// Reads of `key` fail until cleared.
    pub fn fail_reads_of(&self, key: &str) {
        self.faults().failing_reads.insert(key.to_string());
    }

    pub fn clear_read_failures(&self) {
        self.faults().failing_reads.clear();
    }

    /// The next write fails; later writes succeed.
    pub fn fail_next_write(&self) {
        self.faults().fail_next_write = true;
    }

    /// Allows `n` more writes, then fails every write.
    pub fn fail_writes_after(&self, n: usize) {
        self.faults().writes_left = Some(n);
    }

    /// Writes that reached the inner store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, StoreFaults> {
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        let mut faults = self.faults();
        if faults.fail_all {
            return Err(injected());
        }
        if std::mem::take(&mut faults.fail_next_write) {
            return Err(injected());
        }
        if let Some(left) = faults.writes_left.as_mut() {
            if *left == 0 {
                return Err(injected());
            }
            *left -= 1;
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FailingStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.check_write()?;
        self.inner.put(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        {
            let faults = self.faults();
            if faults.fail_all || faults.failing_reads.contains(key) {
                return Err(injected());
            }
        }
        self.inner.get(key).await
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanBatch, StoreError> {
        {
            let faults = self.faults();
            if faults.fail_all || faults.fail_scans {
                return Err(injected());
            }
        }
        self.inner.scan(prefix, cursor, count).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

/// [`SearchIndex`] wrapper with switchable failures.
pub struct FailingIndex {
    inner: Arc<dyn SearchIndex>,
    fail_probe: AtomicBool,
    fail_search: AtomicBool,
    fail_writes: AtomicBool,
    failed_writes: AtomicUsize,
}

impl FailingIndex {
    pub fn new(inner: Arc<dyn SearchIndex>) -> Self {
        Self {
            inner,
            fail_probe: AtomicBool::new(false),
            fail_search: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            failed_writes: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Document writes rejected so far.
    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndex for FailingIndex {
    async fn probe(&self) -> Result<(), IndexError> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(IndexError::Unavailable("unknown command 'FT._LIST'".to_string()));
        }
        self.inner.probe().await
    }

    async fn ensure_index(&self) -> Result<(), IndexError> {
        self.inner.ensure_index().await
    }

    async fn index_document(&self, doc: IndexDocument) -> Result<(), IndexError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(IndexError::Write("injected failure".to_string()));
        }
        self.inner.index_document(doc).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(IndexError::Query("injected failure".to_string()));
        }
        self.inner.search(query).await
    }

    async fn close(&self) -> Result<(), IndexError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_write_budget_then_failure() {
        let (inner, _handle) = MemoryStore::spawn(8);
        let store = FailingStore::new(Arc::new(inner));
        store.fail_writes_after(2);

        assert!(store.put("a", vec![1]).await.is_ok());
        assert!(store.put("b", vec![2]).await.is_ok());
        assert_eq!(store.put("c", vec![3]).await, Err(injected()));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_single_shot_write_failure() {
        let (inner, _handle) = MemoryStore::spawn(8);
        let store = FailingStore::new(Arc::new(inner));
        store.fail_next_write();

        assert!(store.put("a", vec![1]).await.is_err());
        assert!(store.put("a", vec![1]).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_failure_is_per_key() {
        let (inner, _handle) = MemoryStore::spawn(8);
        let store = FailingStore::new(Arc::new(inner));
        store.put("a", vec![1]).await.unwrap();
        store.put("b", vec![2]).await.unwrap();
        store.fail_reads_of("a");

        assert_eq!(store.get("a").await, Err(injected()));
        assert_eq!(store.get("b").await, Ok(vec![2]));

        store.clear_read_failures();
        assert_eq!(store.get("a").await, Ok(vec![1]));
    }

    #[tokio::test]
    async fn test_fail_all_blocks_every_operation_until_cleared() {
        let (inner, _handle) = MemoryStore::spawn(8);
        let store = FailingStore::new(Arc::new(inner));
        store.put("a", vec![1]).await.unwrap();
        store.set_fail_all(true);

        assert_eq!(store.get("a").await, Err(injected()));
        assert_eq!(store.put("b", vec![2]).await, Err(injected()));
        assert!(store.scan("", 0, 10).await.is_err());

        store.set_fail_all(false);
        assert_eq!(store.get("a").await, Ok(vec![1]));
        assert_eq!(store.writes(), 1);
    }
}
