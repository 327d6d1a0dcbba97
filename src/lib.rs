//! halocat - user-supplied halo catalogs
//!
//! Validates dark-matter halo catalogs (plus optional particle tables)
//! handed over as loosely-typed name/value input, and registers validated
//! catalogs in a persistent on-disk cache.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;

pub use cache::{CacheLogEntry, CacheRequest, HaloTableCache, RemoveOptions};
pub use catalog::{CatalogArgs, CatalogValue, HaloCatalog};
pub use error::{HalocatError, HalocatResult};
