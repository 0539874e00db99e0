//! Pure data structures for the catalog: the stored [`Product`] and its creation payload.

pub mod product;

pub use product::*;
