//! # Seeding
//!
//! Grows the catalog to a configured minimum size. Safe to run at every startup:
//!
//! 1. Enumerate existing product IDs with a prefix scan.
//! 2. Stop if the catalog already has `target` records.
//! 3. Write each base product whose ID is missing.
//! 4. Generate random products until `target` is reached. A generated ID that is
//!    already present is skipped, not treated as an error.
//!
//! Records go through [`Catalog::create_product`], so they are indexed as well.
//! The first write failure stops seeding; the error reports how many writes landed.

pub mod samples;

pub use self::samples::{base_products, SampleGenerator, CATEGORIES};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::model::id_from_key;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Interval between progress log lines while generating.
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Records found before anything was written.
    pub existing: usize,
    pub base_written: usize,
    pub generated: usize,
    /// Known record count when seeding finished.
    pub total: usize,
}

impl SeedReport {
    pub fn written(&self) -> usize {
        self.base_written + self.generated
    }
}

pub struct Seeder<'a> {
    catalog: &'a Catalog,
    target: usize,
    generator: SampleGenerator,
}

impl<'a> Seeder<'a> {
    pub fn new(catalog: &'a Catalog, target: usize) -> Self {
        Self {
            catalog,
            target,
            generator: SampleGenerator::default(),
        }
    }

    pub fn with_generator(mut self, generator: SampleGenerator) -> Self {
        self.generator = generator;
        self
    }

    #[instrument(skip(self), fields(seed_target = self.target))]
    pub async fn run(mut self) -> Result<SeedReport, CatalogError> {
        let mut existing = self.existing_ids().await.map_err(|e| seeding(0, e))?;
        let mut report = SeedReport {
            existing: existing.len(),
            ..SeedReport::default()
        };

        if existing.len() >= self.target {
            info!(count = existing.len(), "Product catalog already seeded");
            report.total = existing.len();
            return Ok(report);
        }

        for params in base_products() {
            let Some(id) = params.id.clone() else { continue };
            if existing.contains(&id) {
                continue;
            }
            self.catalog
                .create_product(params)
                .await
                .map_err(|e| seeding(report.written(), e))?;
            existing.insert(id);
            report.base_written += 1;
        }

        while existing.len() < self.target {
            let id = self.generator.next_id();
            if existing.contains(&id) {
                debug!(%id, "Generated ID already present");
                continue;
            }
            let params = self.generator.next_product(id.clone());
            self.catalog
                .create_product(params)
                .await
                .map_err(|e| seeding(report.written(), e))?;
            existing.insert(id);
            report.generated += 1;

            if existing.len() % PROGRESS_INTERVAL == 0 {
                info!(count = existing.len(), "Seeding products");
            }
        }

        report.total = existing.len();
        info!(
            count = report.total,
            base = report.base_written,
            generated = report.generated,
            "Ensured product seed data present"
        );
        Ok(report)
    }

    async fn existing_ids(&self) -> Result<HashSet<String>, CatalogError> {
        let keys = self
            .catalog
            .product_keys()
            .collect_keys()
            .await
            .map_err(CatalogError::StoreScan)?;
        Ok(keys
            .iter()
            .filter_map(|key| id_from_key(key))
            .map(str::to_string)
            .collect())
    }
}

fn seeding(written: usize, source: CatalogError) -> CatalogError {
    CatalogError::Seeding {
        written,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductCreate;
    use crate::search::SearchCapability;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn catalog() -> Catalog {
        let (store, _handle) = MemoryStore::spawn(64);
        Catalog::new(Arc::new(store), SearchCapability::Disabled)
    }

    #[tokio::test]
    async fn test_small_target_writes_only_base_products() {
        let catalog = catalog();
        let report = Seeder::new(&catalog, 5).run().await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                existing: 0,
                base_written: 5,
                generated: 0,
                total: 5
            }
        );
        assert_eq!(catalog.get_product("seed-3").await.unwrap().name, "Office Chair");
    }

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let catalog = catalog();
        Seeder::new(&catalog, 12).run().await.unwrap();
        let again = Seeder::new(&catalog, 12).run().await.unwrap();
        assert_eq!(again.existing, 12);
        assert_eq!(again.written(), 0);
        assert_eq!(catalog.list_products(1, 1, "", "").await.unwrap().total, 12);
    }

    #[tokio::test]
    async fn test_missing_base_products_are_filled_in() {
        let catalog = catalog();
        catalog
            .create_product(ProductCreate::new("Custom", "x", 1.0, "Home", 1).with_id("seed-2"))
            .await
            .unwrap();

        let report = Seeder::new(&catalog, 8)
            .with_generator(SampleGenerator::seeded(1))
            .run()
            .await
            .unwrap();
        assert_eq!(report.existing, 1);
        assert_eq!(report.base_written, 4);
        assert_eq!(report.generated, 3);
        assert_eq!(catalog.get_product("seed-2").await.unwrap().name, "Custom");
    }
}
