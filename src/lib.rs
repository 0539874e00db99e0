//! # Catalog Store
//!
//! > **A product catalog on a key-value store, with an optional search index.**
//!
//! This crate stores product records in Redis (or an in-process actor store), keeps a
//! best-effort RediSearch projection of them, grows the catalog to a configured size at
//! startup, and answers paginated, filterable, searchable listings.
//!
//! ## 🏗️ Design Notes
//!
//! ### 1. The store is the source of truth
//! Every product lives under `product:<id>` as JSON. The search index is written after the
//! store and may lag behind it; a failed index write never fails a create.
//!
//! ### 2. Two query paths, one contract
//! A listing with a search query and an available index runs on the index; everything else
//! scans every product key and filters in memory. Both paths sort by ascending price and
//! report `total` over the whole match set. See [`catalog`].
//!
//! ### 3. Re-runnable seeding
//! Seeding enumerates existing IDs first and only writes what is missing, so restarting the
//! service never duplicates records. See [`seed`].
//!
//! ### 4. Adapters behind traits
//! The catalog only sees [`KvStore`](store::KvStore) and
//! [`SearchIndex`](search::SearchIndex). The in-memory implementations are Tokio actors
//! (one task, one mailbox, oneshot replies), so tests run the exact code paths production
//! does without a Redis server.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`catalog`])
//! - **Role**: `create_product`, `get_product`, `list_products`.
//! - **Key items**: [`Catalog`](catalog::Catalog), [`ProductPage`](catalog::ProductPage).
//!
//! ### 2. The Adapters ([`store`], [`search`])
//! - **Role**: Redis `SET`/`GET`/`SCAN`, RediSearch `FT.*`, and their in-memory twins.
//! - **Key items**: [`PrefixScan`](store::PrefixScan),
//!   [`SearchCapability`](search::SearchCapability).
//!
//! ### 3. Startup ([`seed`], [`verify`], [`lifecycle`])
//! - **Role**: Fill the catalog, sanity-check it, wire everything from [`config`].
//! - **Key items**: [`CatalogService`](lifecycle::CatalogService),
//!   [`Seeder`](seed::Seeder).
//!
//! ### 4. Testing ([`mock`])
//! - **Role**: Adapter wrappers that fail on demand.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # In-memory backend, five demo products
//! CATALOG__BACKEND=memory CATALOG__SEED_TARGET=5 RUST_LOG=info cargo run
//!
//! # Against a local Redis Stack
//! CATALOG__REDIS_URL=redis://127.0.0.1:6379 cargo run
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod search;
pub mod seed;
pub mod store;
pub mod verify;
