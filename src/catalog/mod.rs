//! # Catalog
//!
//! Product storage and retrieval on top of a [`KvStore`], with an optional
//! [`SearchIndex`] projection.
//!
//! ## Query paths
//!
//! [`Catalog::list_products`] picks exactly one path per call:
//!
//! - **Indexed**: the search query is non-empty and search is enabled. The index does
//!   filtering, sorting and pagination; the records themselves are re-read from the store.
//! - **Scan**: everything else. Every product key is enumerated, each record is read and
//!   decoded, and filtering, sorting and pagination happen in memory.
//!
//! A failing indexed query is reported as [`CatalogError::SearchFailed`]; it never falls
//! back to a scan.

pub mod query;

pub use self::query::{ListQuery, ProductPage};

use self::query::{paginate, sort_canonical, SORT_DESCENDING, SORT_FIELD};

use crate::error::{CatalogError, StoreError};
use crate::model::{product_key, Product, ProductCreate, PRODUCT_KEY_PREFIX};
use crate::search::{IndexDocument, SearchCapability, SearchIndex, SearchQuery, SortBy};
use crate::store::{KvStore, PrefixScan, DEFAULT_SCAN_BATCH};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Which strategy serves a listing.
enum QueryPath<'a> {
    Indexed(&'a dyn SearchIndex),
    Scan,
}

pub struct Catalog {
    store: Arc<dyn KvStore>,
    search: SearchCapability,
    scan_batch_size: usize,
}

impl Catalog {
    pub fn new(store: Arc<dyn KvStore>, search: SearchCapability) -> Self {
        Self {
            store,
            search,
            scan_batch_size: DEFAULT_SCAN_BATCH,
        }
    }

    /// Overrides the `COUNT` hint used for each scan step.
    pub fn with_scan_batch_size(mut self, scan_batch_size: usize) -> Self {
        self.scan_batch_size = scan_batch_size.max(1);
        self
    }

    pub fn search_capability(&self) -> &SearchCapability {
        &self.search
    }

    /// A fresh scan over every product key.
    pub fn product_keys(&self) -> PrefixScan<'_> {
        PrefixScan::new(self.store.as_ref(), PRODUCT_KEY_PREFIX, self.scan_batch_size)
    }

    /// Creates the search index when search is enabled. A no-op otherwise.
    pub async fn ensure_index(&self) -> Result<(), CatalogError> {
        match self.search.index() {
            Some(index) => index.ensure_index().await.map_err(CatalogError::SearchFailed),
            None => Ok(()),
        }
    }

    /// Stores a new product and returns it with its ID and timestamp filled in.
    ///
    /// An existing record with the same ID is overwritten. Indexing is best-effort:
    /// once the record write succeeds, an index failure is logged and the call succeeds.
    #[instrument(skip(self, params), fields(id = tracing::field::Empty))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<Product, CatalogError> {
        let product = params.into_product();
        tracing::Span::current().record("id", product.id.as_str());

        let value = serde_json::to_vec(&product).map_err(|e| CatalogError::Marshal {
            id: product.id.clone(),
            message: e.to_string(),
        })?;

        let key = product.key();
        self.store
            .put(&key, value)
            .await
            .map_err(|source| CatalogError::StoreWrite {
                key: key.clone(),
                source,
            })?;

        if let Some(index) = self.search.index() {
            if let Err(e) = index.index_document(index_document(&product)).await {
                warn!(key = %key, error = %e, "Failed to index product");
            }
        }

        debug!("Product created");
        Ok(product)
    }

    /// Reads one product by ID.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<Product, CatalogError> {
        match self.fetch(&product_key(id)).await {
            Err(CatalogError::StoreRead {
                source: StoreError::NotFound(_),
                ..
            }) => Err(CatalogError::NotFound(id.to_string())),
            other => other,
        }
    }

    /// Returns one page of products, optionally filtered by exact category and free text.
    ///
    /// `page < 1` is treated as 1 and `page_size <= 0` as 10. `total` is the size of the
    /// full match set. Records that fail to read or decode are skipped.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: i32,
        page_size: i32,
        category: &str,
        search_query: &str,
    ) -> Result<ProductPage, CatalogError> {
        let query = ListQuery::new(page, page_size, category, search_query);
        match self.query_path(&query) {
            QueryPath::Indexed(index) => self.list_indexed(index, &query).await,
            QueryPath::Scan => self.list_scanned(&query).await,
        }
    }

    /// Closes the store, then the search index. Later operations fail on both paths.
    ///
    /// The store's result is returned; an index that fails to close is only logged.
    pub async fn close(&self) -> Result<(), CatalogError> {
        let closed = self.store.close().await.map_err(CatalogError::Close);
        if let Some(index) = self.search.index() {
            if let Err(e) = index.close().await {
                warn!(error = %e, "Search index did not close cleanly");
            }
        }
        closed
    }

    fn query_path(&self, query: &ListQuery) -> QueryPath<'_> {
        match self.search.index() {
            Some(index) if query.has_search() => QueryPath::Indexed(index),
            _ => QueryPath::Scan,
        }
    }

    async fn list_indexed(
        &self,
        index: &dyn SearchIndex,
        query: &ListQuery,
    ) -> Result<ProductPage, CatalogError> {
        let search = SearchQuery {
            text: query.search.clone(),
            tag_filters: if query.has_category() {
                vec![("category".to_string(), query.category.clone())]
            } else {
                Vec::new()
            },
            sort: Some(SortBy {
                field: SORT_FIELD.to_string(),
                descending: SORT_DESCENDING,
            }),
            offset: query.offset(),
            limit: query.limit(),
        };

        let hits = index
            .search(&search)
            .await
            .map_err(CatalogError::SearchFailed)?;

        let mut products = Vec::with_capacity(hits.keys.len());
        for key in &hits.keys {
            match self.fetch(key).await {
                Ok(product) => products.push(product),
                Err(e) => warn!(key = %key, error = %e, "Skipping indexed product"),
            }
        }

        debug!(total = hits.total, returned = products.len(), "Indexed listing");
        Ok(ProductPage {
            products,
            total: hits.total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn list_scanned(&self, query: &ListQuery) -> Result<ProductPage, CatalogError> {
        let keys = self
            .product_keys()
            .collect_keys()
            .await
            .map_err(CatalogError::StoreScan)?;

        let mut matched = Vec::new();
        for key in &keys {
            match self.fetch(key).await {
                Ok(product) if query.matches(&product) => matched.push(product),
                Ok(_) => {}
                Err(CatalogError::StoreRead {
                    source: StoreError::NotFound(_),
                    ..
                }) => debug!(key = %key, "Key vanished during scan"),
                Err(e) => warn!(key = %key, error = %e, "Skipping product"),
            }
        }

        sort_canonical(&mut matched);
        let page = paginate(matched, query);
        debug!(scanned = keys.len(), total = page.total, "Scan listing");
        Ok(page)
    }

    async fn fetch(&self, key: &str) -> Result<Product, CatalogError> {
        let bytes = self
            .store
            .get(key)
            .await
            .map_err(|source| CatalogError::StoreRead {
                key: key.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}

/// Search projection of a product.
pub fn index_document(product: &Product) -> IndexDocument {
    IndexDocument::new(product.key())
        .text("name", product.name.as_str())
        .text("description", product.description.as_str())
        .text("category", product.category.as_str())
        .numeric("price", product.price)
        .numeric("stock", f64::from(product.stock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::search::{FieldValue, IndexSchema, MemoryIndex};
    use crate::store::MemoryStore;

    async fn catalog(with_search: bool) -> Catalog {
        let (store, _handle) = MemoryStore::spawn(16);
        let search = if with_search {
            let (index, _handle) = MemoryIndex::spawn(16, IndexSchema::products());
            SearchCapability::detect(Arc::new(index)).await
        } else {
            SearchCapability::Disabled
        };
        let catalog = Catalog::new(Arc::new(store), search).with_scan_batch_size(3);
        catalog.ensure_index().await.unwrap();
        catalog
    }

    async fn fill(catalog: &Catalog) {
        for (id, name, price, category) in [
            ("a", "Gaming Laptop", 1500.0, "Electronics"),
            ("b", "Laptop Stand", 40.0, "Furniture"),
            ("c", "Budget Laptop", 400.0, "Electronics"),
            ("d", "Desk Lamp", 25.0, "Home"),
            ("e", "Wireless Mouse", 40.0, "Electronics"),
        ] {
            catalog
                .create_product(ProductCreate::new(name, "plain item", price, category, 5).with_id(id))
                .await
                .unwrap();
        }
    }

    fn ids(page: &ProductPage) -> Vec<&str> {
        page.products.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let catalog = catalog(false).await;
        let created = catalog
            .create_product(ProductCreate::new("Office Chair", "Lumbar support", 199.99, "Furniture", 30))
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let fetched = catalog.get_product(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let catalog = catalog(false).await;
        let result = catalog.get_product("nope").await;
        assert_eq!(result, Err(CatalogError::NotFound("nope".to_string())));
    }

    #[tokio::test]
    async fn test_create_with_existing_id_overwrites() {
        let catalog = catalog(false).await;
        fill(&catalog).await;
        catalog
            .create_product(ProductCreate::new("Renamed", "x", 1.0, "Home", 0).with_id("a"))
            .await
            .unwrap();

        assert_eq!(catalog.get_product("a").await.unwrap().name, "Renamed");
        assert_eq!(catalog.list_products(1, 10, "", "").await.unwrap().total, 5);
    }

    #[tokio::test]
    async fn test_scan_listing_sorts_filters_and_pages() {
        let catalog = catalog(false).await;
        fill(&catalog).await;

        let page = catalog.list_products(1, 2, "", "").await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(ids(&page), vec!["d", "b"]);

        let page = catalog.list_products(2, 2, "", "").await.unwrap();
        assert_eq!(ids(&page), vec!["e", "c"]);

        let page = catalog.list_products(1, 10, "Electronics", "").await.unwrap();
        assert_eq!(ids(&page), vec!["e", "c", "a"]);

        let page = catalog.list_products(1, 10, "", "LAPTOP").await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(ids(&page), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_indexed_listing_applies_category_and_total() {
        let catalog = catalog(true).await;
        fill(&catalog).await;

        let page = catalog.list_products(1, 1, "Electronics", "laptop").await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(ids(&page), vec!["c"]);

        let page = catalog.list_products(2, 1, "Electronics", "laptop").await.unwrap();
        assert_eq!(ids(&page), vec!["a"]);

        let page = catalog.list_products(1, 10, "electronics", "laptop").await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_empty_search_uses_scan_even_with_index() {
        let catalog = catalog(true).await;
        fill(&catalog).await;
        let page = catalog.list_products(0, 0, "", "").await.unwrap();
        assert_eq!((page.page, page.page_size, page.total), (1, 10, 5));
    }

    #[tokio::test]
    async fn test_scan_skips_undecodable_records() {
        let (store, _handle) = MemoryStore::spawn(16);
        let store: Arc<dyn KvStore> = Arc::new(store);
        store.put("product:broken", b"{not json".to_vec()).await.unwrap();
        let catalog = Catalog::new(store, SearchCapability::Disabled);
        fill(&catalog).await;

        let page = catalog.list_products(1, 10, "", "").await.unwrap();
        assert_eq!(page.total, 5);
        assert!(matches!(
            catalog.get_product("broken").await,
            Err(CatalogError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_listings_fail_after_close() {
        let catalog = catalog(true).await;
        fill(&catalog).await;
        catalog.close().await.unwrap();

        assert!(matches!(
            catalog.list_products(1, 10, "", "laptop").await,
            Err(CatalogError::SearchFailed(IndexError::Unavailable(_)))
        ));
        assert!(matches!(
            catalog.list_products(1, 10, "", "").await,
            Err(CatalogError::StoreScan(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            catalog.get_product("a").await,
            Err(CatalogError::StoreRead { .. })
        ));
        assert!(matches!(catalog.close().await, Err(CatalogError::Close(_))));
    }

    #[test]
    fn test_index_document_projects_product_fields() {
        let product = ProductCreate::new("Desk Lamp", "Warm light", 25.5, "Home", 7)
            .with_id("lamp")
            .into_product();
        let doc = index_document(&product);
        assert_eq!(doc.key, "product:lamp");
        assert_eq!(doc.get("category"), Some(&FieldValue::Text("Home".to_string())));
        assert_eq!(doc.get("price"), Some(&FieldValue::Numeric(25.5)));
        assert_eq!(doc.get("stock"), Some(&FieldValue::Numeric(7.0)));
    }
}
