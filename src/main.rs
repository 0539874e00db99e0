use catalog_store::config::CatalogConfig;
use catalog_store::lifecycle::{setup_tracing, CatalogService};
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = CatalogConfig::load().map_err(|e| e.to_string())?;
    info!(
        backend = ?config.backend,
        redis_url = %config.redis_url,
        "Starting catalog service"
    );

    let service = CatalogService::start(&config).await.map_err(|e| {
        error!(error = %e, "Failed to start catalog");
        e.to_string()
    })?;

    let span = tracing::info_span!("sample_listing");
    async {
        match service.catalog().list_products(1, 5, "", "").await {
            Ok(page) => {
                info!(total = page.total, "Cheapest products");
                for product in &page.products {
                    info!(id = %product.id, name = %product.name, price = product.price, "Product");
                }
            }
            Err(e) => error!(error = %e, "Sample listing failed"),
        }
    }
    .instrument(span)
    .await;

    info!("Catalog service is running; press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    service.shutdown().await.map_err(|e| e.to_string())
}
