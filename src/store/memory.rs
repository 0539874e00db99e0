//! # In-Memory Store
//!
//! An actor-backed [`KvStore`]. The [`MemoryStore`] task owns a sorted map and processes
//! requests one at a time, so every single-key operation is atomic without locks.
//! [`MemoryStoreClient`] is the cheap, cloneable handle that sends requests and awaits
//! the one-shot replies.
//!
//! ```rust,ignore
//! let (actor, client) = MemoryStore::new(64);
//! let handle = tokio::spawn(actor.run());
//! client.put("product:1", b"{}".to_vec()).await?;
//! client.close().await?;
//! handle.await?;
//! ```

use super::{KvStore, ScanBatch};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Type alias for the one-shot reply channel.
type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Requests understood by the store actor.
#[derive(Debug)]
enum StoreRequest {
    Put {
        key: String,
        value: Vec<u8>,
        respond_to: Response<()>,
    },
    Get {
        key: String,
        respond_to: Response<Vec<u8>>,
    },
    Scan {
        prefix: String,
        cursor: u64,
        count: usize,
        respond_to: Response<ScanBatch>,
    },
    Close {
        respond_to: Response<()>,
    },
}

/// The server half: owns the records and the receiving end of the mailbox.
pub struct MemoryStore {
    receiver: mpsc::Receiver<StoreRequest>,
    records: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates the actor and its client. The actor does nothing until [`run`](Self::run)
    /// is spawned.
    pub fn new(buffer_size: usize) -> (Self, MemoryStoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            records: BTreeMap::new(),
        };
        (actor, MemoryStoreClient { sender })
    }

    /// Convenience for tests and the demo binary: spawns the actor and returns the client.
    pub fn spawn(buffer_size: usize) -> (MemoryStoreClient, tokio::task::JoinHandle<()>) {
        let (actor, client) = Self::new(buffer_size);
        (client, tokio::spawn(actor.run()))
    }

    /// Processes requests until every client is dropped or `close` is received.
    pub async fn run(mut self) {
        info!("Memory store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Put {
                    key,
                    value,
                    respond_to,
                } => {
                    self.records.insert(key, value);
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Get { key, respond_to } => {
                    let result = self
                        .records
                        .get(&key)
                        .cloned()
                        .ok_or(StoreError::NotFound(key));
                    let _ = respond_to.send(result);
                }
                StoreRequest::Scan {
                    prefix,
                    cursor,
                    count,
                    respond_to,
                } => {
                    let _ = respond_to.send(Ok(self.scan(&prefix, cursor, count)));
                }
                StoreRequest::Close { respond_to } => {
                    debug!("Close requested");
                    let _ = respond_to.send(Ok(()));
                    break;
                }
            }
        }

        info!(size = self.records.len(), "Memory store shutdown");
    }

    /// Cursor is the number of prefix-matching keys already handed out.
    fn scan(&self, prefix: &str, cursor: u64, count: usize) -> ScanBatch {
        let skip = usize::try_from(cursor).unwrap_or(usize::MAX);
        let mut matching = self
            .records
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .skip(skip);

        let keys: Vec<String> = matching.by_ref().take(count).cloned().collect();
        let more = matching.next().is_some();
        let cursor = if more { cursor + keys.len() as u64 } else { 0 };
        ScanBatch { cursor, keys }
    }
}

/// A cloneable handle to a running [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryStoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl MemoryStoreClient {
    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::Unavailable("memory store closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::Unavailable("memory store dropped response".to_string()))?
    }
}

#[async_trait]
impl KvStore for MemoryStoreClient {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let key = key.to_string();
        self.request(|respond_to| StoreRequest::Put {
            key,
            value,
            respond_to,
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let key = key.to_string();
        self.request(|respond_to| StoreRequest::Get { key, respond_to })
            .await
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanBatch, StoreError> {
        let prefix = prefix.to_string();
        self.request(|respond_to| StoreRequest::Scan {
            prefix,
            cursor,
            count: count.max(1),
            respond_to,
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::Close { respond_to })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PrefixScan;

    #[tokio::test]
    async fn test_put_get_and_not_found() {
        let (client, _handle) = MemoryStore::spawn(8);

        client.put("product:1", b"one".to_vec()).await.unwrap();
        assert_eq!(client.get("product:1").await.unwrap(), b"one".to_vec());

        let missing = client.get("product:2").await;
        assert_eq!(missing, Err(StoreError::NotFound("product:2".to_string())));
    }

    #[tokio::test]
    async fn test_scan_pages_through_prefix_only() {
        let (client, _handle) = MemoryStore::spawn(8);
        for i in 0..25 {
            client.put(&format!("product:{i:02}"), vec![]).await.unwrap();
        }
        client.put("order:1", vec![]).await.unwrap();
        client.put("productx", vec![]).await.unwrap();

        let first = client.scan("product:", 0, 10).await.unwrap();
        assert_eq!(first.keys.len(), 10);
        assert_eq!(first.cursor, 10);

        let keys = PrefixScan::new(&client, "product:", 10)
            .collect_keys()
            .await
            .unwrap();
        assert_eq!(keys.len(), 25);
        assert!(keys.iter().all(|k| k.starts_with("product:")));
    }

    #[tokio::test]
    async fn test_scan_of_empty_store_finishes_immediately() {
        let (client, _handle) = MemoryStore::spawn(8);
        let batch = client.scan("product:", 0, 10).await.unwrap();
        assert_eq!(batch, ScanBatch::default());
    }

    #[tokio::test]
    async fn test_close_stops_actor() {
        let (client, handle) = MemoryStore::spawn(8);
        client.put("product:1", vec![1]).await.unwrap();

        client.close().await.unwrap();
        handle.await.unwrap();

        let result = client.get("product:1").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
