//! # Persisted Media Index
//!
//! Durable keyed collection of media records plus the single-row scan
//! metadata store, backed by SQLite via `sqlx`.
//!
//! The sync engine treats this crate as a black box with insert-or-replace
//! semantics keyed by item identity: repositories expose key lookup, bulk
//! listing, bulk write, and bulk delete, and nothing else.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{IndexError, Result};
pub use models::{MediaRecord, ScanMetadata};
pub use repositories::{
    MediaRepository, ScanMetadataRepository, SqliteMediaRepository, SqliteScanMetadataRepository,
};
