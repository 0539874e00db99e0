//! RediSearch-backed [`SearchIndex`].
//!
//! Index documents are hashes stored at `idx:<store key>`, next to (not on top of) the
//! JSON records, so indexing never interferes with the authoritative record value.
//! A filterable text field is written twice: once as `TEXT` for full-text matching and
//! once as a case-sensitive `TAG` attribute named `<field>_tag` for exact filters.
//!
//! The index shares the record store's connection slot, so closing the store also
//! closes the index.

use super::{
    tokenize, FieldKind, FieldValue, IndexDocument, IndexSchema, SearchHits, SearchIndex,
    SearchQuery,
};
use crate::error::IndexError;
use crate::store::SharedConnection;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Value;
use tracing::{debug, instrument};

/// Prefix of the hashes the index is defined over.
pub const DOCUMENT_PREFIX: &str = "idx:";

const TAG_SUFFIX: &str = "_tag";

pub struct RediSearchIndex {
    conn: SharedConnection,
    name: String,
    schema: IndexSchema,
}

impl RediSearchIndex {
    pub fn new(conn: SharedConnection, name: impl Into<String>, schema: IndexSchema) -> Self {
        Self {
            conn,
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn live_connection(&self) -> Result<MultiplexedConnection, IndexError> {
        self.conn
            .get()
            .ok_or_else(|| IndexError::Unavailable("connection closed".to_string()))
    }
}

fn tag_attribute(field: &str) -> String {
    format!("{}{}", field, TAG_SUFFIX)
}

/// Arguments of `FT.CREATE` after the command name.
pub(crate) fn create_args(name: &str, schema: &IndexSchema) -> Vec<String> {
    let mut args: Vec<String> = vec![
        name.to_string(),
        "ON".into(),
        "HASH".into(),
        "PREFIX".into(),
        "1".into(),
        DOCUMENT_PREFIX.into(),
        "SCHEMA".into(),
    ];
    for field in &schema.fields {
        match field.kind {
            FieldKind::Text => {
                args.push(field.name.clone());
                args.push("TEXT".into());
                if field.filterable {
                    args.push(tag_attribute(&field.name));
                    args.push("TAG".into());
                    args.push("CASESENSITIVE".into());
                }
            }
            FieldKind::Numeric => {
                args.push(field.name.clone());
                args.push("NUMERIC".into());
                if field.sortable {
                    args.push("SORTABLE".into());
                }
            }
        }
    }
    args
}

/// Escapes a value for use inside a `{...}` tag clause.
pub(crate) fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_punctuation() || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Query string: the free-text terms followed by one tag clause per filter.
///
/// The text is reduced to its [`tokenize`] terms, so query syntax characters in user
/// input (`-`, `|`, `@`, `%`, ...) never reach the parser.
pub(crate) fn query_string(query: &SearchQuery) -> String {
    let terms = tokenize(&query.text);
    let mut q = if terms.is_empty() {
        "*".to_string()
    } else {
        terms.join(" ")
    };
    for (field, value) in &query.tag_filters {
        q.push_str(&format!(" @{}:{{{}}}", tag_attribute(field), escape_tag(value)));
    }
    q
}

/// Arguments of `FT.SEARCH` after the command name.
pub(crate) fn search_args(name: &str, query: &SearchQuery) -> Vec<String> {
    let mut args = vec![name.to_string(), query_string(query), "NOCONTENT".to_string()];
    if let Some(sort) = &query.sort {
        args.push("SORTBY".into());
        args.push(sort.field.clone());
        args.push(if sort.descending { "DESC" } else { "ASC" }.into());
    }
    args.push("LIMIT".into());
    args.push(query.offset.to_string());
    args.push(query.limit.to_string());
    args
}

/// Parses a `NOCONTENT` reply: `[total, docKey, docKey, ...]`.
pub(crate) fn parse_search_reply(reply: &[Value]) -> Result<SearchHits, IndexError> {
    let (total, docs) = reply
        .split_first()
        .ok_or_else(|| IndexError::Query("empty search reply".to_string()))?;
    let total: usize =
        redis::from_redis_value(total).map_err(|e| IndexError::Query(e.to_string()))?;

    let mut keys = Vec::with_capacity(docs.len());
    for doc in docs {
        let doc_key: String =
            redis::from_redis_value(doc).map_err(|e| IndexError::Query(e.to_string()))?;
        let key = doc_key
            .strip_prefix(DOCUMENT_PREFIX)
            .map(str::to_string)
            .unwrap_or(doc_key);
        keys.push(key);
    }
    Ok(SearchHits { keys, total })
}

#[async_trait]
impl SearchIndex for RediSearchIndex {
    async fn probe(&self) -> Result<(), IndexError> {
        let mut conn = self.live_connection()?;
        let _: Value = redis::cmd("FT._LIST")
            .query_async(&mut conn)
            .await
            .map_err(|e| IndexError::Unavailable(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.name))]
    async fn ensure_index(&self) -> Result<(), IndexError> {
        let mut conn = self.live_connection()?;
        let result: redis::RedisResult<Value> = redis::cmd("FT.CREATE")
            .arg(create_args(&self.name, &self.schema))
            .query_async(&mut conn)
            .await;
        match result {
            Ok(_) => {
                debug!("Index created");
                Ok(())
            }
            Err(e) if e.to_string().to_lowercase().contains("already exists") => {
                debug!(error = %e, "Index already exists");
                Ok(())
            }
            Err(e) => Err(IndexError::Schema(e.to_string())),
        }
    }

    async fn index_document(&self, doc: IndexDocument) -> Result<(), IndexError> {
        let mut conn = self.live_connection()?;
        let mut cmd = redis::cmd("HSET");
        cmd.arg(format!("{}{}", DOCUMENT_PREFIX, doc.key));
        for (name, value) in &doc.fields {
            match value {
                FieldValue::Text(text) => {
                    cmd.arg(name).arg(text);
                    if self.schema.field(name).is_some_and(|f| f.filterable) {
                        cmd.arg(tag_attribute(name)).arg(text);
                    }
                }
                FieldValue::Numeric(n) => {
                    cmd.arg(name).arg(*n);
                }
            }
        }
        let _: Value = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| IndexError::Write(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError> {
        let mut conn = self.live_connection()?;
        let reply: Vec<Value> = redis::cmd("FT.SEARCH")
            .arg(search_args(&self.name, query))
            .query_async(&mut conn)
            .await
            .map_err(|e| IndexError::Query(e.to_string()))?;
        parse_search_reply(&reply)
    }

    /// Releases the shared connection. Already released is fine: the store may have
    /// closed it first.
    async fn close(&self) -> Result<(), IndexError> {
        if self.conn.release() {
            debug!(index = %self.name, "Index connection released");
        }
        Ok(())
    }
}
