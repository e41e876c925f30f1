//! File System Media Source using Tokio
//!
//! Enumerates image files under a root directory and presents them through
//! the [`MediaSource`] contract. Identities are derived from the file path,
//! so an item keeps its id across scans as long as it does not move.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    source::{MediaItem, MediaSource},
};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::debug;

/// Extensions recognized as gallery images, compared case-insensitively.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "bmp"];

/// Media source backed by a directory tree of image files.
///
/// Each snapshot is a full recursive walk: there is no change notification
/// on this platform, so the sync engine re-enumerates every pass.
pub struct FileSystemMediaSource {
    root: PathBuf,
}

impl FileSystemMediaSource {
    /// Create a source rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a source rooted at the platform pictures directory.
    pub fn pictures() -> Self {
        let root = dirs::picture_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
        Self::new(root)
    }

    /// The enumerated root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive a stable positive identity from the file path.
    fn identity_for(path: &Path) -> i64 {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) & (i64::MAX as u64)) as i64
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    async fn item_for(path: PathBuf) -> Result<MediaItem> {
        let metadata = fs::metadata(&path).await.map_err(BridgeError::Io)?;

        let date_taken = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let bucket = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(MediaItem {
            id: Self::identity_for(&path),
            uri: format!("file://{}", path.display()),
            date_taken,
            bucket,
            size: metadata.len() as i64,
        })
    }
}

#[async_trait]
impl MediaSource for FileSystemMediaSource {
    async fn snapshot(&self) -> Result<Vec<MediaItem>> {
        if !fs::try_exists(&self.root).await.map_err(BridgeError::Io)? {
            return Err(BridgeError::SourceUnavailable(format!(
                "media root does not exist: {}",
                self.root.display()
            )));
        }

        let mut items = Vec::new();
        let mut pending = vec![self.root.clone()];

        // Iterative walk; any I/O failure aborts the whole snapshot so the
        // engine never diffs against a partial view.
        while let Some(dir) = pending.pop() {
            let mut read_dir = fs::read_dir(&dir).await.map_err(BridgeError::Io)?;

            while let Some(entry) = read_dir.next_entry().await.map_err(BridgeError::Io)? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(BridgeError::Io)?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && Self::is_image(&path) {
                    items.push(Self::item_for(path).await?);
                }
            }
        }

        // Newest capture first, matching the persisted index ordering.
        items.sort_by(|a, b| b.date_taken.cmp(&a.date_taken));

        debug!(root = %self.root.display(), count = items.len(), "Enumerated media root");
        Ok(items)
    }
}
