//! # Logging
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter. The level comes
//! from `RUST_LOG` and defaults to `info`.
//!
//! ```bash
//! # Seeding progress, index probe outcome, startup/shutdown
//! RUST_LOG=info cargo run
//!
//! # Per-call spans, skipped records, index-create results
//! RUST_LOG=debug cargo run
//!
//! # Only the query engine
//! RUST_LOG=catalog_store::catalog=debug cargo run
//! ```
//!
//! Catalog operations run inside `#[instrument]` spans, so a skipped record shows up as
//! `list_products{page=1 page_size=10 category="" search_query="lamp"}: Skipping indexed product`.

use tracing_subscriber::EnvFilter;

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
