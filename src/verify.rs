//! Post-seeding sanity check.

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::model::id_from_key;
use tracing::info;

/// What verification observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub total: usize,
    /// The record that was read back end to end.
    pub sample_id: String,
}

/// Checks that the catalog holds at least `minimum` records and that one of them can be
/// read back by ID.
pub async fn verify_catalog(catalog: &Catalog, minimum: usize) -> Result<VerifyReport, CatalogError> {
    let total = catalog.list_products(1, 1, "", "").await?.total;
    if total < minimum {
        return Err(CatalogError::Verification(format!(
            "insufficient seed data: have {total} products, expected at least {minimum}"
        )));
    }

    let sample_id = sample_product_id(catalog)
        .await?
        .ok_or_else(|| CatalogError::Verification("no products found after seeding".to_string()))?;

    catalog.get_product(&sample_id).await.map_err(|e| {
        CatalogError::Verification(format!("failed to retrieve sample product {sample_id}: {e}"))
    })?;

    info!(count = total, sample = %sample_id, "Verified product catalog");
    Ok(VerifyReport { total, sample_id })
}

/// First product ID the key scan yields.
async fn sample_product_id(catalog: &Catalog) -> Result<Option<String>, CatalogError> {
    let mut scan = catalog.product_keys();
    while let Some(keys) = scan.next_batch().await.map_err(CatalogError::StoreScan)? {
        if let Some(id) = keys.iter().find_map(|key| id_from_key(key)) {
            return Ok(Some(id.to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchCapability;
    use crate::seed::Seeder;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn catalog() -> Catalog {
        let (store, _handle) = MemoryStore::spawn(16);
        Catalog::new(Arc::new(store), SearchCapability::Disabled)
    }

    #[tokio::test]
    async fn test_verify_after_seeding() {
        let catalog = catalog();
        Seeder::new(&catalog, 5).run().await.unwrap();

        let report = verify_catalog(&catalog, 5).await.unwrap();
        assert_eq!(report.total, 5);
        assert!(report.sample_id.starts_with("seed-"));
    }

    #[tokio::test]
    async fn test_verify_reports_short_catalog() {
        let catalog = catalog();
        Seeder::new(&catalog, 5).run().await.unwrap();

        let err = verify_catalog(&catalog, 6).await.unwrap_err();
        assert!(matches!(err, CatalogError::Verification(msg) if msg.contains("have 5")));
    }

    #[tokio::test]
    async fn test_verify_empty_catalog_with_zero_minimum() {
        let err = verify_catalog(&catalog(), 0).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::Verification("no products found after seeding".to_string())
        );
    }
}
