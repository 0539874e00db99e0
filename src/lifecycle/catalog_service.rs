use crate::catalog::Catalog;
use crate::config::{CatalogConfig, StoreBackend};
use crate::error::CatalogError;
use crate::search::{IndexSchema, MemoryIndex, RediSearchIndex, SearchCapability, SearchIndex};
use crate::seed::{SeedReport, Seeder};
use crate::store::{KvStore, MemoryStore, RedisStore};
use crate::verify::{verify_catalog, VerifyReport};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A started catalog together with the tasks backing it.
///
/// # Startup
///
/// [`CatalogService::start`] runs the whole startup sequence:
/// 1. Open the store. Failure aborts startup.
/// 2. Probe the search index once. Failure disables search.
/// 3. Create the index if search is enabled.
/// 4. Seed up to `seed_target` records.
/// 5. Verify the catalog.
///
/// Steps 3 to 5 only warn on failure; the service still starts with whatever data is there.
///
/// # Example
///
/// ```ignore
/// let service = CatalogService::start(&CatalogConfig::load()?).await?;
/// let page = service.catalog().list_products(1, 10, "", "").await?;
/// service.shutdown().await?;
/// ```
pub struct CatalogService {
    catalog: Catalog,
    seed_report: Option<SeedReport>,
    verify_report: Option<VerifyReport>,
    /// Actor tasks owned by the service (in-memory backend only).
    handles: Vec<JoinHandle<()>>,
}

impl CatalogService {
    pub async fn start(config: &CatalogConfig) -> Result<Self, CatalogError> {
        info!(backend = ?config.backend, seed_target = config.seed_target, "Starting catalog");

        match config.backend {
            StoreBackend::Redis => {
                let store = RedisStore::connect(&config.redis_url)
                    .await
                    .map_err(CatalogError::StoreUnavailable)?;
                let index: Arc<dyn SearchIndex> = Arc::new(RediSearchIndex::new(
                    store.connection(),
                    config.index_name.as_str(),
                    IndexSchema::products(),
                ));
                let index = config.search_enabled.then_some(index);
                Ok(Self::bootstrap(Arc::new(store), index, config, Vec::new()).await)
            }
            StoreBackend::Memory => {
                let (store, store_handle) = MemoryStore::spawn(config.channel_capacity);
                let mut handles = vec![store_handle];
                let index = if config.search_enabled {
                    let (index, index_handle) =
                        MemoryIndex::spawn(config.channel_capacity, IndexSchema::products());
                    handles.push(index_handle);
                    Some(Arc::new(index) as Arc<dyn SearchIndex>)
                } else {
                    None
                };
                Ok(Self::bootstrap(Arc::new(store), index, config, handles).await)
            }
        }
    }

    /// Runs steps 2 to 5 of the startup sequence on an already opened store.
    ///
    /// `handles` are awaited on shutdown; they must finish once the store is closed and
    /// the catalog dropped.
    pub async fn bootstrap(
        store: Arc<dyn KvStore>,
        index: Option<Arc<dyn SearchIndex>>,
        config: &CatalogConfig,
        handles: Vec<JoinHandle<()>>,
    ) -> Self {
        let search = match index {
            Some(index) => SearchCapability::detect(index).await,
            None => {
                info!("Search disabled by configuration");
                SearchCapability::Disabled
            }
        };

        let catalog = Catalog::new(store, search).with_scan_batch_size(config.scan_batch_size);

        if let Err(e) = catalog.ensure_index().await {
            warn!(error = %e, "Failed to create search index, continuing anyway");
        }

        let seed_report = match Seeder::new(&catalog, config.seed_target).run().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Failed to seed data");
                None
            }
        };

        let verify_report = match verify_catalog(&catalog, config.seed_target).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Product data verification failed");
                None
            }
        };

        Self {
            catalog,
            seed_report,
            verify_report,
            handles,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// `None` when seeding failed.
    pub fn seed_report(&self) -> Option<&SeedReport> {
        self.seed_report.as_ref()
    }

    /// `None` when verification failed.
    pub fn verify_report(&self) -> Option<&VerifyReport> {
        self.verify_report.as_ref()
    }

    /// Closes the store, drops the catalog and waits for the actor tasks.
    pub async fn shutdown(self) -> Result<(), CatalogError> {
        info!("Shutting down catalog...");

        let closed = self.catalog.close().await;
        drop(self.catalog);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(CatalogError::ActorFailed(e.to_string()));
            }
        }

        closed?;
        info!("Catalog shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(seed_target: usize, search_enabled: bool) -> CatalogConfig {
        CatalogConfig {
            backend: StoreBackend::Memory,
            search_enabled,
            seed_target,
            channel_capacity: 32,
            ..CatalogConfig::default()
        }
    }

    #[tokio::test]
    async fn test_memory_service_starts_seeds_and_shuts_down() {
        let service = CatalogService::start(&memory_config(7, true)).await.unwrap();
        assert!(service.catalog().search_capability().is_enabled());
        assert_eq!(service.seed_report().map(|r| r.total), Some(7));
        assert_eq!(service.verify_report().map(|r| r.total), Some(7));

        let page = service.catalog().list_products(1, 10, "", "").await.unwrap();
        assert_eq!(page.total, 7);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_search_can_be_disabled_by_config() {
        let service = CatalogService::start(&memory_config(5, false)).await.unwrap();
        assert!(!service.catalog().search_capability().is_enabled());
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_startup() {
        let config = CatalogConfig {
            redis_url: "redis://127.0.0.1:1/".to_string(),
            ..CatalogConfig::default()
        };
        let result = CatalogService::start(&config).await;
        assert!(matches!(result, Err(CatalogError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_panicked_actor_is_reported_on_shutdown() {
        let config = memory_config(5, false);
        let (store, store_handle) = MemoryStore::spawn(config.channel_capacity);
        let crashed = tokio::spawn(async { panic!("mailbox poisoned") });

        let service =
            CatalogService::bootstrap(Arc::new(store), None, &config, vec![store_handle, crashed])
                .await;
        assert_eq!(service.seed_report().map(|r| r.total), Some(5));

        let result = service.shutdown().await;
        assert!(matches!(result, Err(CatalogError::ActorFailed(_))));
    }
}
