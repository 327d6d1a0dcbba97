//! Persistent cache of registered halo catalogs
//!
//! The cache is a directory holding a human-readable log
//! (`halo_table_cache_log.txt` by default) plus the catalog files the log
//! points to. Catalog files may live anywhere on disk; the log records
//! their absolute paths.
//!
//! # Registration
//!
//! | Step | Failure |
//! |------|---------|
//! | Parent directory exists | `PathNotFound` |
//! | Target free, or `overwrite` set | `FileExistsConflict` |
//! | `.hdf5` extension | `InvalidFileExtension` |
//! | Identifying fields and metadata render as strings | `MetadataType` |
//! | Write, log, rename | rolled back, `Io` |
//!
//! # Limitations
//!
//! Two processes registering into the same log at once can lose each
//! other's entries: the log is read once, mutated in memory, and rewritten.

pub mod log;
pub mod registrar;
pub mod store;

pub use log::{CacheLogEntry, EntryFilter, EntryIssue, HaloTableCache, RemoveOptions, DEFAULT_DZ_TOL};
pub use registrar::CacheRequest;
pub use store::{CatalogFile, ColumnarFileStore, TableStore, CANONICAL_EXTENSION};
