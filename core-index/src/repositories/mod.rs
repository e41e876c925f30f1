//! Repository traits and SQLite implementations for the persisted index.

pub mod media;
pub mod scan_metadata;

pub use media::{MediaRepository, SqliteMediaRepository};
pub use scan_metadata::{ScanMetadataRepository, SqliteScanMetadataRepository};
