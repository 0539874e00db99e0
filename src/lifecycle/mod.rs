//! Startup, shutdown and logging setup.

pub mod catalog_service;
pub mod tracing;

pub use self::catalog_service::CatalogService;
pub use self::tracing::setup_tracing;
