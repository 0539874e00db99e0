//! Optional secondary search index.
//!
//! The index is a denormalized, best-effort projection of the record store. It may lag
//! or diverge; its absence never blocks reads or writes. Whether it is present is decided
//! once, when the catalog is built, by [`SearchCapability::detect`].
//!
//! # Implementations
//!
//! - [`RediSearchIndex`] - RediSearch module (`FT.*` commands).
//! - [`MemoryIndex`] - actor-backed reference index with the same contract.

pub mod memory;
pub mod redisearch;

pub use self::memory::{MemoryIndex, MemoryIndexClient};
pub use self::redisearch::RediSearchIndex;

use crate::error::IndexError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Kind of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
}

/// One field of the index schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
    /// Text field that can also be used in exact tag filters.
    pub filterable: bool,
    /// Numeric field usable as a sort key.
    pub sortable: bool,
}

impl SchemaField {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text,
            filterable: false,
            sortable: false,
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric,
            filterable: false,
            sortable: false,
        }
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }
}

/// Field layout of the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    pub fields: Vec<SchemaField>,
}

impl IndexSchema {
    /// Schema of the product index: text {name, description, category},
    /// numeric {price, stock}. Category doubles as a tag filter, price as the sort key.
    pub fn products() -> Self {
        Self {
            fields: vec![
                SchemaField::text("name"),
                SchemaField::text("description"),
                SchemaField::text("category").filterable(),
                SchemaField::numeric("price").sortable(),
                SchemaField::numeric("stock"),
            ],
        }
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A value stored in an index document.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Numeric(f64),
}

/// A document to upsert, addressed by the store key of the record it projects.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    pub key: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl IndexDocument {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .push((name.to_string(), FieldValue::Text(value.into())));
        self
    }

    pub fn numeric(mut self, name: &str, value: f64) -> Self {
        self.fields.push((name.to_string(), FieldValue::Numeric(value)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Result ordering for a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SortBy {
    pub field: String,
    pub descending: bool,
}

/// A search request. `offset`/`limit` are applied by the index itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Free text.
    pub text: String,
    /// Exact-match clauses `(field, value)` conjoined with the text.
    pub tag_filters: Vec<(String, String)>,
    pub sort: Option<SortBy>,
    pub offset: usize,
    pub limit: usize,
}

/// Matching store keys for the requested page plus the size of the full match set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub keys: Vec<String>,
    pub total: usize,
}

/// Secondary index contract.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Capability probe. An error means the index is not available at all.
    async fn probe(&self) -> Result<(), IndexError>;

    /// Creates the index if needed. "Already exists" is success.
    async fn ensure_index(&self) -> Result<(), IndexError>;

    /// Upserts one document.
    async fn index_document(&self, doc: IndexDocument) -> Result<(), IndexError>;

    /// Runs a query and returns one page of keys plus the total match count.
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError>;

    /// Releases the index's resources. Later calls fail with [`IndexError::Unavailable`].
    async fn close(&self) -> Result<(), IndexError>;
}

/// Splits free text into lowercase search terms.
///
/// Any character other than a letter, a digit or `_` separates terms, which is how the
/// RediSearch default tokenizer reads both documents and queries. Neither implementation
/// here stems terms; RediSearch does, so `lamps` also finds `lamp` there but not in
/// [`MemoryIndex`].
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether the catalog has a search index, resolved once at construction.
#[derive(Clone)]
pub enum SearchCapability {
    Disabled,
    Enabled(Arc<dyn SearchIndex>),
}

impl SearchCapability {
    /// Probes `index` once. Any failure disables search for the lifetime of the catalog.
    pub async fn detect(index: Arc<dyn SearchIndex>) -> Self {
        match index.probe().await {
            Ok(()) => {
                info!("Search index available; indexed queries enabled");
                SearchCapability::Enabled(index)
            }
            Err(e) => {
                warn!(error = %e, "Search index not available; search features disabled");
                SearchCapability::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, SearchCapability::Enabled(_))
    }

    pub fn index(&self) -> Option<&dyn SearchIndex> {
        match self {
            SearchCapability::Enabled(index) => Some(index.as_ref()),
            SearchCapability::Disabled => None,
        }
    }
}

impl std::fmt::Debug for SearchCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchCapability::Disabled => write!(f, "Disabled"),
            SearchCapability::Enabled(_) => write!(f, "Enabled"),
        }
    }
}
