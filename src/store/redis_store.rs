//! Redis-backed [`KvStore`].

use super::{KvStore, ScanBatch};
use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// One multiplexed connection shared by the store and the search index.
///
/// Clones of the inner connection are handed out per call so concurrent requests
/// pipeline over the same socket. [`SharedConnection::release`] drops the slot; once the
/// calls in flight finish, the connection's driver task ends and the socket closes.
#[derive(Clone, Default)]
pub struct SharedConnection {
    slot: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl SharedConnection {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// A handle for one call, or `None` after release.
    pub fn get(&self) -> Option<MultiplexedConnection> {
        self.lock().clone()
    }

    /// Drops the connection. Returns `false` if it was already released.
    pub fn release(&self) -> bool {
        self.lock().take().is_some()
    }

    pub fn is_released(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<MultiplexedConnection>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Record store on a single Redis database.
pub struct RedisStore {
    conn: SharedConnection,
}

impl RedisStore {
    /// Connects and verifies the server answers `PING`.
    ///
    /// Failure here is fatal for the catalog: there is no store to fall back to.
    #[instrument(skip(url), fields(server = %redact_url(url)))]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        info!(%pong, "Connected to redis");

        Ok(Self::from_shared(SharedConnection::new(conn)))
    }

    pub(crate) fn from_shared(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// The connection slot, for adapters that must close together with the store.
    pub fn connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    fn live_connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.conn
            .get()
            .ok_or_else(|| StoreError::Unavailable("store closed".to_string()))
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// The URL without its `user:password@` part, for logs.
pub(crate) fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// `SCAN` pattern for every key beginning with `prefix`.
///
/// Glob metacharacters in the prefix are escaped so they match literally.
pub(crate) fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl KvStore for RedisStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.live_connection()?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.live_connection()?;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        value.ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn scan(&self, prefix: &str, cursor: u64, count: usize) -> Result<ScanBatch, StoreError> {
        let mut conn = self.live_connection()?;
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(match_pattern(prefix))
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(ScanBatch { cursor, keys })
    }

    async fn close(&self) -> Result<(), StoreError> {
        if !self.conn.release() {
            return Err(StoreError::Unavailable("store already closed".to_string()));
        }
        debug!("Redis connection released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_pattern_escapes_glob_characters() {
        assert_eq!(match_pattern("product:"), "product:*");
        assert_eq!(match_pattern("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }

    #[test]
    fn test_redact_url_hides_credentials() {
        assert_eq!(redact_url("redis://:s3cret@cache:6379/0"), "redis://cache:6379/0");
        assert_eq!(redact_url("redis://app:pw@10.0.0.1"), "redis://10.0.0.1");
        assert_eq!(redact_url("redis://127.0.0.1:6379"), "redis://127.0.0.1:6379");
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_is_unavailable() {
        let result = RedisStore::connect("redis://127.0.0.1:1/").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_released_connection_fails_every_call() {
        let store = RedisStore::from_shared(SharedConnection::default());
        let closed = StoreError::Unavailable("store closed".to_string());

        assert_eq!(store.get("product:1").await, Err(closed.clone()));
        assert_eq!(store.put("product:1", vec![1]).await, Err(closed.clone()));
        assert_eq!(store.scan("product:", 0, 10).await, Err(closed));
        assert!(store.close().await.is_err());
        assert!(store.connection().is_released());
    }
}
