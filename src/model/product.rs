use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Key prefix shared by every product record.
pub const PRODUCT_KEY_PREFIX: &str = "product:";

/// Represents a product in the catalog.
///
/// # Storage
/// Each product is stored as one record under [`Product::key`]. The record value is the
/// JSON form of this struct; field names are preserved so records written by an older
/// build still decode when fields are added (unknown fields are ignored on read).
///
/// Products are never updated or deleted through the catalog. See
/// [`ProductCreate`] for the creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Store key for this product.
    pub fn key(&self) -> String {
        product_key(&self.id)
    }

    /// Case-insensitive substring match against name or description.
    ///
    /// `needle_lower` must already be lowercase.
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }
}

/// Payload for creating a product.
///
/// `id` and `created_at` are assigned by the catalog when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCreate {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub stock: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl ProductCreate {
    /// Creates a payload without an ID or timestamp.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        category: impl Into<String>,
        stock: i32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            price,
            category: category.into(),
            stock,
            created_at: None,
        }
    }

    /// Sets a caller-chosen ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Fills in the ID and timestamp and produces the stored form.
    pub fn into_product(self) -> Product {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => next_product_id(),
        };
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            stock: self.stock,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Store key for a product ID.
pub fn product_key(id: &str) -> String {
    format!("{}{}", PRODUCT_KEY_PREFIX, id)
}

/// Extracts the product ID from a store key, if it carries the product prefix.
pub fn id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(PRODUCT_KEY_PREFIX)
}

static LAST_ISSUED_NANOS: AtomicI64 = AtomicI64::new(0);

/// Generates a server-assigned product ID from the current UTC time in nanoseconds.
///
/// IDs are strictly increasing within the process: if the clock has not advanced since
/// the last call the previous value is bumped by one.
pub fn next_product_id() -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut last = LAST_ISSUED_NANOS.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ISSUED_NANOS.compare_exchange_weak(
            last,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_round_trip() {
        let key = product_key("seed-1");
        assert_eq!(key, "product:seed-1");
        assert_eq!(id_from_key(&key), Some("seed-1"));
        assert_eq!(id_from_key("order:1"), None);
    }

    #[test]
    fn test_into_product_assigns_missing_fields() {
        let product = ProductCreate::new("Lamp", "Desk lamp", 12.5, "Home", 3).into_product();
        assert!(!product.id.is_empty());
        assert!(product.id.parse::<i64>().is_ok());
        assert_eq!(product.name, "Lamp");

        let explicit = ProductCreate::new("Lamp", "", 1.0, "Home", 0)
            .with_id("lamp-1")
            .into_product();
        assert_eq!(explicit.id, "lamp-1");
    }

    #[test]
    fn test_empty_id_is_treated_as_absent() {
        let product = ProductCreate::new("Lamp", "", 1.0, "Home", 0)
            .with_id("")
            .into_product();
        assert!(!product.id.is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..1000).map(|_| next_product_id()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id generated");
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn test_json_record_round_trip_and_forward_compat() {
        let product = ProductCreate::new("Mouse", "Wireless", 29.99, "Electronics", 200)
            .with_id("seed-2")
            .into_product();
        let bytes = serde_json::to_vec(&product).unwrap();
        let decoded: Product = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, product);

        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["color"] = serde_json::Value::String("black".into());
        let decoded: Product = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, product);
    }

    #[test]
    fn test_matches_text_checks_name_or_description() {
        let product = ProductCreate::new("Office Chair", "Lumbar SUPPORT", 1.0, "Furniture", 1)
            .into_product();
        assert!(product.matches_text("chair"));
        assert!(product.matches_text("support"));
        assert!(!product.matches_text("laptop"));
    }
}
