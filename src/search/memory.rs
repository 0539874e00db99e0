//! # In-Memory Search Index
//!
//! Actor-backed [`SearchIndex`] with RediSearch-like semantics, used by tests and the
//! in-memory backend:
//!
//! - every query term must equal (case-insensitively) a whole term of at least one
//!   text field, with both sides split by [`tokenize`]. Unlike RediSearch, terms are
//!   not stemmed;
//! - tag filters compare the raw field value exactly;
//! - results are ordered by the requested numeric field, ties broken by key;
//! - `total` counts the whole match set before `offset`/`limit` are applied.

use super::{
    tokenize, FieldKind, FieldValue, IndexDocument, IndexSchema, SearchHits, SearchIndex,
    SearchQuery,
};
use crate::error::IndexError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type Response<T> = oneshot::Sender<Result<T, IndexError>>;

#[derive(Debug)]
enum IndexRequest {
    EnsureIndex {
        respond_to: Response<()>,
    },
    Index {
        doc: IndexDocument,
        respond_to: Response<()>,
    },
    Search {
        query: SearchQuery,
        respond_to: Response<SearchHits>,
    },
    Close {
        respond_to: Response<()>,
    },
}

/// The server half: owns the documents.
pub struct MemoryIndex {
    receiver: mpsc::Receiver<IndexRequest>,
    schema: IndexSchema,
    created: bool,
    documents: BTreeMap<String, IndexDocument>,
}

impl MemoryIndex {
    pub fn new(buffer_size: usize, schema: IndexSchema) -> (Self, MemoryIndexClient) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            schema,
            created: false,
            documents: BTreeMap::new(),
        };
        (actor, MemoryIndexClient { sender })
    }

    /// Spawns the actor and returns its client.
    pub fn spawn(
        buffer_size: usize,
        schema: IndexSchema,
    ) -> (MemoryIndexClient, tokio::task::JoinHandle<()>) {
        let (actor, client) = Self::new(buffer_size, schema);
        (client, tokio::spawn(actor.run()))
    }

    /// Processes requests until a close request arrives or every client is dropped.
    pub async fn run(mut self) {
        info!("Memory index started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                IndexRequest::EnsureIndex { respond_to } => {
                    if self.created {
                        debug!("Index already exists");
                    }
                    self.created = true;
                    let _ = respond_to.send(Ok(()));
                }
                IndexRequest::Index { doc, respond_to } => {
                    self.documents.insert(doc.key.clone(), doc);
                    let _ = respond_to.send(Ok(()));
                }
                IndexRequest::Search { query, respond_to } => {
                    let _ = respond_to.send(self.search(&query));
                }
                IndexRequest::Close { respond_to } => {
                    debug!("Close requested");
                    let _ = respond_to.send(Ok(()));
                    break;
                }
            }
        }

        info!(size = self.documents.len(), "Memory index shutdown");
    }

    fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError> {
        if !self.created {
            return Err(IndexError::Query("no such index".to_string()));
        }
        for (field, _) in &query.tag_filters {
            if !self.schema.field(field).is_some_and(|f| f.filterable) {
                return Err(IndexError::Query(format!("unknown tag field: {field}")));
            }
        }
        if let Some(sort) = &query.sort {
            if !self.schema.field(&sort.field).is_some_and(|f| f.sortable) {
                return Err(IndexError::Query(format!("field not sortable: {}", sort.field)));
            }
        }

        let terms = tokenize(&query.text);

        let mut matches: Vec<&IndexDocument> = self
            .documents
            .values()
            .filter(|doc| self.matches_terms(doc, &terms))
            .filter(|doc| {
                query.tag_filters.iter().all(|(field, value)| {
                    matches!(doc.get(field), Some(FieldValue::Text(v)) if v == value)
                })
            })
            .collect();

        if let Some(sort) = &query.sort {
            matches.sort_by(|a, b| {
                let ord = numeric(a, &sort.field)
                    .total_cmp(&numeric(b, &sort.field))
                    .then_with(|| a.key.cmp(&b.key));
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let total = matches.len();
        let keys = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|doc| doc.key.clone())
            .collect();
        Ok(SearchHits { keys, total })
    }

    fn matches_terms(&self, doc: &IndexDocument, terms: &[String]) -> bool {
        if terms.is_empty() {
            return true;
        }
        let doc_terms: Vec<String> = self
            .schema
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Text)
            .filter_map(|f| match doc.get(&f.name) {
                Some(FieldValue::Text(v)) => Some(tokenize(v)),
                _ => None,
            })
            .flatten()
            .collect();
        terms.iter().all(|term| doc_terms.contains(term))
    }
}

fn numeric(doc: &IndexDocument, field: &str) -> f64 {
    match doc.get(field) {
        Some(FieldValue::Numeric(n)) => *n,
        _ => f64::NEG_INFINITY,
    }
}

/// A cloneable handle to a running [`MemoryIndex`].
#[derive(Clone)]
pub struct MemoryIndexClient {
    sender: mpsc::Sender<IndexRequest>,
}

impl MemoryIndexClient {
    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> IndexRequest,
    ) -> Result<T, IndexError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| IndexError::Unavailable("memory index closed".to_string()))?;
        response
            .await
            .map_err(|_| IndexError::Unavailable("memory index dropped response".to_string()))?
    }
}

#[async_trait]
impl SearchIndex for MemoryIndexClient {
    async fn probe(&self) -> Result<(), IndexError> {
        if self.sender.is_closed() {
            return Err(IndexError::Unavailable("memory index closed".to_string()));
        }
        Ok(())
    }

    async fn ensure_index(&self) -> Result<(), IndexError> {
        self.request(|respond_to| IndexRequest::EnsureIndex { respond_to })
            .await
    }

    async fn index_document(&self, doc: IndexDocument) -> Result<(), IndexError> {
        self.request(|respond_to| IndexRequest::Index { doc, respond_to })
            .await
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError> {
        let query = query.clone();
        self.request(|respond_to| IndexRequest::Search { query, respond_to })
            .await
    }

    async fn close(&self) -> Result<(), IndexError> {
        self.request(|respond_to| IndexRequest::Close { respond_to })
            .await
    }
}
