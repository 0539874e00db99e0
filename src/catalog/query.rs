//! Listing requests, result pages and the in-memory half of the scan path.
//!
//! # Ordering contract
//! Both query paths return products by ascending price. The scan path breaks price ties
//! by ID, so its pages are deterministic for a fixed key set.

use crate::model::Product;

/// Page used when the caller passes `page < 1`.
pub const DEFAULT_PAGE: i32 = 1;
/// Page size used when the caller passes `page_size <= 0`.
pub const DEFAULT_PAGE_SIZE: i32 = 10;
/// Index field results are sorted by.
pub const SORT_FIELD: &str = "price";
/// Sort direction for both paths.
pub const SORT_DESCENDING: bool = false;

/// A normalized `ListProducts` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: i32,
    pub page_size: i32,
    /// Exact-match category filter; empty means no filter.
    pub category: String,
    /// Free-text query; empty means no text filter.
    pub search: String,
    search_lower: String,
}

impl ListQuery {
    /// Builds a query, replacing out-of-range paging values with defaults.
    pub fn new(page: i32, page_size: i32, category: &str, search: &str) -> Self {
        Self {
            page: if page < 1 { DEFAULT_PAGE } else { page },
            page_size: if page_size <= 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            category: category.to_string(),
            search: search.to_string(),
            search_lower: search.to_lowercase(),
        }
    }

    /// Number of matching records before this page.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }

    pub fn has_search(&self) -> bool {
        !self.search.is_empty()
    }

    pub fn has_category(&self) -> bool {
        !self.category.is_empty()
    }

    /// Scan-path filter: exact category and case-insensitive text on name or description.
    pub fn matches(&self, product: &Product) -> bool {
        if self.has_category() && product.category != self.category {
            return false;
        }
        if self.has_search() && !product.matches_text(&self.search_lower) {
            return false;
        }
        true
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Size of the full match set, never the page length.
    pub total: usize,
    pub page: i32,
    pub page_size: i32,
}

impl ProductPage {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size.max(1) as usize)
    }
}

/// Sorts by price, then ID.
pub fn sort_canonical(products: &mut [Product]) {
    products.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.id.cmp(&b.id)));
}

/// Cuts one page out of the full filtered set.
///
/// A page past the end is empty but still reports the full total.
pub fn paginate(filtered: Vec<Product>, query: &ListQuery) -> ProductPage {
    let total = filtered.len();
    let start = query.offset();
    let products = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(query.limit()).min(total);
        let mut filtered = filtered;
        filtered.truncate(end);
        filtered.split_off(start)
    };
    ProductPage {
        products,
        total,
        page: query.page,
        page_size: query.page_size,
    }
}
