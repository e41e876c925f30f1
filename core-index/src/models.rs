//! Persisted index models.

use bridge_traits::source::MediaItem;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted media row, keyed by the source-assigned identity.
///
/// Carries the reconciled fields from the source snapshot plus optional
/// display metadata the source may not report on every platform. `added_at`
/// records when this row first entered the index.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub uri: String,
    pub date_taken: i64,
    pub bucket: String,
    pub size: i64,
    pub width: i64,
    pub height: i64,
    pub orientation: i64,
    pub mime_type: String,
    pub added_at: i64,
}

impl MediaRecord {
    /// Build a record from a source item, defaulting the optional metadata.
    pub fn from_item(item: &MediaItem, added_at: i64) -> Self {
        Self {
            id: item.id,
            uri: item.uri.clone(),
            date_taken: item.date_taken,
            bucket: item.bucket.clone(),
            size: item.size,
            width: 0,
            height: 0,
            orientation: 0,
            mime_type: "image/jpeg".to_string(),
            added_at,
        }
    }
}

/// The single logical metadata row describing the last successful scan.
///
/// `last_scan_at` is Unix milliseconds and never decreases across scans;
/// `fingerprint` is a SHA-256 hex digest over the sorted identity set that
/// was observed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub last_scan_at: i64,
    pub fingerprint: String,
}
