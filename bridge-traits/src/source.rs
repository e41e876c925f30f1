//! Media Source Abstraction
//!
//! Defines the contract for enumerating discoverable media from a host
//! platform (MediaStore-style content index, a watched directory tree, a
//! removable volume). The sync engine only ever reads from a source; it
//! reconciles the persisted index toward whatever the source reports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One discoverable media item as reported by the source.
///
/// `id` is the reconciliation key: source-assigned, stable, unique, and
/// immutable for the lifetime of the underlying item. Everything else is
/// payload the index stores alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable source-assigned identity
    pub id: i64,
    /// Opaque locator for the item (content URI, file URL)
    pub uri: String,
    /// Capture timestamp in Unix milliseconds
    pub date_taken: i64,
    /// Grouping label (album folder, bucket display name)
    pub bucket: String,
    /// Item size in bytes
    pub size: i64,
}

/// Media source trait
///
/// Produces a full snapshot of the items currently visible to the source.
///
/// # Contract
///
/// - Read-only: enumerating must not mutate the source.
/// - All-or-nothing: a failed enumeration returns an error, never a partial
///   list. The sync engine treats any error here as fatal to the attempt.
/// - Every call re-scans the whole source; there is no change feed.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::MediaSource;
///
/// async fn count_items(source: &dyn MediaSource) -> usize {
///     source.snapshot().await.map(|items| items.len()).unwrap_or(0)
/// }
/// ```
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Enumerate every currently-visible item.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SourceUnavailable`](crate::BridgeError) when
    /// the host denies access, or an I/O error if enumeration fails partway.
    async fn snapshot(&self) -> Result<Vec<MediaItem>>;
}
