//! # Differential Diff Engine
//!
//! Computes the set-reconciliation result between a source snapshot and the
//! persisted index, decides when a full resync is due, and fingerprints the
//! identity set observed by a scan.
//!
//! The engine is deliberately dumb about change capture: there is no change
//! feed or log, every pass re-scans the whole source and diffs it against
//! the whole index in O(n) time and space. That boundary is inherited from
//! the source contract, which only offers full enumeration.

use bridge_traits::source::MediaItem;
use bridge_traits::time::Clock;
use core_index::models::{MediaRecord, ScanMetadata};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Default staleness window before a full resync is forced: 7 days.
pub const DEFAULT_STALENESS_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Result of one reconciliation pass.
///
/// Transient: consumed by the apply step and discarded, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Source items whose identity is absent from the persisted index
    pub new_items: Vec<MediaItem>,
    /// Persisted identities no longer present at the source
    pub deleted_ids: Vec<i64>,
    /// Items present on both sides whose size or capture timestamp changed
    pub updated_items: Vec<MediaItem>,
    /// Count of source items considered unchanged, derived by subtraction
    pub unchanged: usize,
}

impl SyncResult {
    /// True when the pass found nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.new_items.is_empty() && self.deleted_ids.is_empty() && self.updated_items.is_empty()
    }
}

/// Diff engine: staleness gate, set reconciliation, and fingerprinting.
pub struct DiffEngine {
    clock: Arc<dyn Clock>,
    staleness_window_ms: i64,
}

impl DiffEngine {
    /// Create an engine with the default 7-day staleness window.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_staleness_window(clock, DEFAULT_STALENESS_WINDOW_MS)
    }

    /// Create an engine with a custom staleness window (milliseconds).
    pub fn with_staleness_window(clock: Arc<dyn Clock>, staleness_window_ms: i64) -> Self {
        Self {
            clock,
            staleness_window_ms,
        }
    }

    /// The configured staleness window in milliseconds.
    pub fn staleness_window_ms(&self) -> i64 {
        self.staleness_window_ms
    }

    /// Decide whether the next pass must be a full resync.
    ///
    /// True when no scan has ever completed, or when the last successful
    /// scan is at least one staleness window old. This is the sole gate
    /// between full-replace and differential modes; the fingerprint is not
    /// consulted.
    pub fn should_perform_full_sync(&self, metadata: Option<&ScanMetadata>) -> bool {
        match metadata {
            None => true,
            Some(m) => {
                let elapsed = self.clock.unix_timestamp_millis() - m.last_scan_at;
                elapsed >= self.staleness_window_ms
            }
        }
    }

    /// Compute the reconciliation result between a source snapshot and the
    /// persisted records.
    ///
    /// Change detection is intentionally narrow: an intersection item counts
    /// as updated only when its size or capture timestamp differ. Two items
    /// identical in those two fields but differing elsewhere are reported as
    /// unchanged. `unchanged` is derived by subtraction, which is exact
    /// because `updated_items` is a subset of the intersection by
    /// construction.
    pub fn compute_diff(source: &[MediaItem], persisted: &[MediaRecord]) -> SyncResult {
        let source_map: HashMap<i64, &MediaItem> =
            source.iter().map(|item| (item.id, item)).collect();
        let persisted_map: HashMap<i64, &MediaRecord> =
            persisted.iter().map(|record| (record.id, record)).collect();

        let new_items: Vec<MediaItem> = source
            .iter()
            .filter(|item| !persisted_map.contains_key(&item.id))
            .cloned()
            .collect();

        let deleted_ids: Vec<i64> = persisted
            .iter()
            .filter(|record| !source_map.contains_key(&record.id))
            .map(|record| record.id)
            .collect();

        let updated_items: Vec<MediaItem> = source
            .iter()
            .filter(|item| {
                persisted_map
                    .get(&item.id)
                    .map(|existing| {
                        existing.size != item.size || existing.date_taken != item.date_taken
                    })
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let unchanged = source.len() - new_items.len() - updated_items.len();

        SyncResult {
            new_items,
            deleted_ids,
            updated_items,
            unchanged,
        }
    }

    /// Fingerprint an identity set: SHA-256 over the UTF-8 bytes of the
    /// comma-joined, lexicographically sorted identity strings, hex encoded.
    ///
    /// Invariant under permutation of the input. Used for audit and
    /// comparison only.
    pub fn compute_fingerprint(ids: &[i64]) -> String {
        let mut id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        id_strings.sort();
        let combined = id_strings.join(",");

        let digest = Sha256::digest(combined.as_bytes());
        hex::encode(digest)
    }
}
