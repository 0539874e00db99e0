//! Error types for the catalog and its adapters.
//!
//! Each layer owns one enum. Adapter errors ([`StoreError`], [`IndexError`]) describe
//! what the backend said; [`CatalogError`] names the catalog operation that failed so
//! the transport layer can map it to a status code without string matching.

use thiserror::Error;

/// Errors returned by a [`KvStore`](crate::store::KvStore).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The key is absent. Expected during normal operation.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Connection or protocol failure talking to the store.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by a [`SearchIndex`](crate::search::SearchIndex).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    /// The capability probe failed; search stays disabled.
    #[error("Search index unavailable: {0}")]
    Unavailable(String),

    /// The index definition was rejected.
    #[error("Search index schema error: {0}")]
    Schema(String),

    /// A document could not be written to the index.
    #[error("Search index write failed: {0}")]
    Write(String),

    /// A search query failed.
    #[error("Search query failed: {0}")]
    Query(String),
}

/// Errors surfaced by [`Catalog`](crate::catalog::Catalog) operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// No product exists with this ID.
    #[error("Product not found: {0}")]
    NotFound(String),

    /// The product could not be serialized.
    #[error("Failed to marshal product {id}: {message}")]
    Marshal { id: String, message: String },

    /// The store could not be reached when the catalog was opened.
    #[error("Failed to connect to store: {0}")]
    StoreUnavailable(StoreError),

    /// Writing a record failed.
    #[error("Failed to write {key}: {source}")]
    StoreWrite { key: String, source: StoreError },

    /// Reading a single record failed for a reason other than absence.
    #[error("Failed to read {key}: {source}")]
    StoreRead { key: String, source: StoreError },

    /// Enumerating record keys failed.
    #[error("Failed to scan product keys: {0}")]
    StoreScan(StoreError),

    /// A stored record could not be decoded.
    #[error("Failed to decode {key}: {message}")]
    Decode { key: String, message: String },

    /// The indexed query path failed. Never silently downgraded to a scan.
    #[error("Search failed: {0}")]
    SearchFailed(IndexError),

    /// Seeding stopped before reaching its target.
    #[error("Seeding failed after {written} writes: {source}")]
    Seeding {
        written: usize,
        source: Box<CatalogError>,
    },

    /// The post-seeding sanity check did not pass.
    #[error("Catalog verification failed: {0}")]
    Verification(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store was closed.
    #[error("Failed to close store: {0}")]
    Close(StoreError),

    /// A backing actor task panicked or was cancelled.
    #[error("Actor task failed: {0}")]
    ActorFailed(String),
}

impl From<::config::ConfigError> for CatalogError {
    fn from(e: ::config::ConfigError) -> Self {
        CatalogError::Config(e.to_string())
    }
}
