//! # Sync Task
//!
//! The unit of work the scheduler invokes. One run is a strictly sequential
//! pipeline: enumerate the source, pick full or differential mode, apply the
//! result to the persisted index, persist the scan metadata, and report a
//! two-valued outcome back to the scheduler.
//!
//! Every failure along the pipeline collapses to [`TaskOutcome::Retry`]; the
//! scheduler's backoff policy decides what happens next. There is no
//! transient/permanent distinction at this boundary.

use crate::engine::DiffEngine;
use crate::error::{Result, SyncError};
use bridge_traits::source::{MediaItem, MediaSource};
use bridge_traits::time::Clock;
use core_index::models::{MediaRecord, ScanMetadata};
use core_index::repositories::{MediaRepository, ScanMetadataRepository};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Outcome of one sync run, reported to the scheduler.
///
/// Two-valued on purpose: the reference policy retries every failure under
/// backoff and exposes no terminal failure state to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The run completed and metadata was persisted.
    Success,
    /// The run failed or was cancelled; the scheduler should back off and retry.
    Retry,
}

/// The invokable entry point the scheduler drives.
///
/// [`SyncTask`] is the single concrete implementation; the trait exists so
/// the scheduler can be exercised with stub runners in tests.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    /// Execute one run, honoring the cancellation token at I/O boundaries.
    async fn run(&self, cancel: &CancellationToken) -> TaskOutcome;
}

/// One reconciliation run over source, index, and metadata store.
///
/// All collaborators are injected explicitly; the task holds the only write
/// path to the index and the metadata store during a run.
pub struct SyncTask {
    source: Arc<dyn MediaSource>,
    media: Arc<dyn MediaRepository>,
    metadata: Arc<dyn ScanMetadataRepository>,
    engine: DiffEngine,
    clock: Arc<dyn Clock>,
}

impl SyncTask {
    /// Create a new sync task from its collaborators.
    pub fn new(
        source: Arc<dyn MediaSource>,
        media: Arc<dyn MediaRepository>,
        metadata: Arc<dyn ScanMetadataRepository>,
        engine: DiffEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            media,
            metadata,
            engine,
            clock,
        }
    }

    /// Execute one sync run.
    ///
    /// Returns [`TaskOutcome::Success`] when the whole pipeline completed,
    /// [`TaskOutcome::Retry`] for any failure, including cancellation. A
    /// cancelled or failed run may leave the index partially reconciled;
    /// a later run converges it.
    #[instrument(skip(self, cancel), fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&self, cancel: &CancellationToken) -> TaskOutcome {
        match self.run_inner(cancel).await {
            Ok(()) => TaskOutcome::Success,
            Err(SyncError::Cancelled) => {
                warn!("Sync run cancelled");
                TaskOutcome::Retry
            }
            Err(err) => {
                error!(error = %err, "Sync run failed");
                TaskOutcome::Retry
            }
        }
    }

    async fn run_inner(&self, cancel: &CancellationToken) -> Result<()> {
        Self::checkpoint(cancel)?;

        // Fatal on failure: the engine never proceeds with a partial view.
        let snapshot = self.source.snapshot().await?;

        Self::checkpoint(cancel)?;
        let metadata = self.metadata.get().await?;

        if self.engine.should_perform_full_sync(metadata.as_ref()) {
            self.apply_full(&snapshot, cancel).await?;
        } else {
            self.apply_differential(&snapshot, cancel).await?;
        }

        let ids: Vec<i64> = snapshot.iter().map(|item| item.id).collect();
        let fingerprint = DiffEngine::compute_fingerprint(&ids);
        let now = self.clock.unix_timestamp_millis();
        // The scan timestamp never moves backwards, even if the wall clock does.
        let last_scan_at = metadata.map_or(now, |m| now.max(m.last_scan_at));

        Self::checkpoint(cancel)?;
        self.metadata.save(&ScanMetadata {
            last_scan_at,
            fingerprint,
        })
        .await?;

        debug!("Scan metadata persisted");
        Ok(())
    }

    /// Full mode: clear the index and repopulate it from the snapshot.
    async fn apply_full(
        &self,
        snapshot: &[MediaItem],
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(items = snapshot.len(), "Performing full resync");

        Self::checkpoint(cancel)?;
        self.media.clear().await?;

        let now = self.clock.unix_timestamp_millis();
        let records: Vec<MediaRecord> = snapshot
            .iter()
            .map(|item| MediaRecord::from_item(item, now))
            .collect();

        Self::checkpoint(cancel)?;
        self.media.insert_or_replace(&records).await?;

        Ok(())
    }

    /// Differential mode: apply only the changed subset, as three
    /// independent bulk operations in a fixed order, with no atomic wrapper.
    async fn apply_differential(
        &self,
        snapshot: &[MediaItem],
        cancel: &CancellationToken,
    ) -> Result<()> {
        Self::checkpoint(cancel)?;
        let persisted = self.media.get_all().await?;

        let diff = DiffEngine::compute_diff(snapshot, &persisted);
        info!(
            new = diff.new_items.len(),
            deleted = diff.deleted_ids.len(),
            updated = diff.updated_items.len(),
            unchanged = diff.unchanged,
            "Differential sync computed"
        );

        let now = self.clock.unix_timestamp_millis();

        if !diff.deleted_ids.is_empty() {
            Self::checkpoint(cancel)?;
            let removed = self.media.delete_by_ids(&diff.deleted_ids).await?;
            debug!(removed, "Deleted vanished items");
        }

        if !diff.new_items.is_empty() {
            Self::checkpoint(cancel)?;
            let records: Vec<MediaRecord> = diff
                .new_items
                .iter()
                .map(|item| MediaRecord::from_item(item, now))
                .collect();
            self.media.insert_or_replace(&records).await?;
            debug!(inserted = records.len(), "Inserted new items");
        }

        if !diff.updated_items.is_empty() {
            Self::checkpoint(cancel)?;
            let records: Vec<MediaRecord> = diff
                .updated_items
                .iter()
                .map(|item| MediaRecord::from_item(item, now))
                .collect();
            self.media.insert_or_replace(&records).await?;
            debug!(updated = records.len(), "Replaced changed items");
        }

        Ok(())
    }

    fn checkpoint(cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}

#[async_trait]
impl SyncRunner for SyncTask {
    async fn run(&self, cancel: &CancellationToken) -> TaskOutcome {
        SyncTask::run(self, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use chrono::{DateTime, Utc};
    use core_index::error::{IndexError, Result as IndexResult};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Source {}

        #[async_trait]
        impl MediaSource for Source {
            async fn snapshot(&self) -> BridgeResult<Vec<MediaItem>>;
        }
    }

    mock! {
        Media {}

        #[async_trait]
        impl MediaRepository for Media {
            async fn get_all(&self) -> IndexResult<Vec<MediaRecord>>;
            async fn get_by_id(&self, id: i64) -> IndexResult<Option<MediaRecord>>;
            async fn get_by_bucket(&self, bucket: &str) -> IndexResult<Vec<MediaRecord>>;
            async fn insert_or_replace(&self, records: &[MediaRecord]) -> IndexResult<()>;
            async fn delete_by_ids(&self, ids: &[i64]) -> IndexResult<u64>;
            async fn clear(&self) -> IndexResult<()>;
            async fn count(&self) -> IndexResult<i64>;
            async fn all_ids(&self) -> IndexResult<Vec<i64>>;
        }
    }

    mock! {
        Metadata {}

        #[async_trait]
        impl ScanMetadataRepository for Metadata {
            async fn get(&self) -> IndexResult<Option<ScanMetadata>>;
            async fn save(&self, metadata: &ScanMetadata) -> IndexResult<()>;
        }
    }

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.0).unwrap()
        }
    }

    fn item(id: i64) -> MediaItem {
        MediaItem {
            id,
            uri: format!("content://media/{}", id),
            date_taken: 10,
            bucket: "Camera".to_string(),
            size: 100,
        }
    }

    fn task(
        source: MockSource,
        media: MockMedia,
        metadata: MockMetadata,
        now_millis: i64,
    ) -> SyncTask {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now_millis));
        SyncTask::new(
            Arc::new(source),
            Arc::new(media),
            Arc::new(metadata),
            DiffEngine::new(Arc::clone(&clock)),
            clock,
        )
    }

    #[tokio::test]
    async fn test_source_failure_collapses_to_retry() {
        let mut source = MockSource::new();
        source
            .expect_snapshot()
            .times(1)
            .returning(|| Err(BridgeError::SourceUnavailable("gone".to_string())));

        let mut metadata = MockMetadata::new();
        metadata.expect_get().times(0);
        metadata.expect_save().times(0);

        let task = task(source, MockMedia::new(), metadata, 1_000);

        assert_eq!(task.run(&CancellationToken::new()).await, TaskOutcome::Retry);
    }

    #[tokio::test]
    async fn test_index_failure_skips_metadata_save() {
        let mut source = MockSource::new();
        source
            .expect_snapshot()
            .returning(|| Ok(vec![item(1)]));

        let mut media = MockMedia::new();
        media
            .expect_clear()
            .times(1)
            .returning(|| Err(IndexError::Database(sqlx::Error::PoolClosed)));

        let mut metadata = MockMetadata::new();
        metadata.expect_get().returning(|| Ok(None));
        metadata.expect_save().times(0);

        let task = task(source, media, metadata, 1_000);

        assert_eq!(task.run(&CancellationToken::new()).await, TaskOutcome::Retry);
    }

    #[tokio::test]
    async fn test_noop_differential_still_persists_metadata() {
        let mut source = MockSource::new();
        source
            .expect_snapshot()
            .returning(|| Ok(vec![item(1), item(2)]));

        let mut media = MockMedia::new();
        media.expect_get_all().times(1).returning(|| {
            Ok(vec![
                MediaRecord::from_item(&item(1), 0),
                MediaRecord::from_item(&item(2), 0),
            ])
        });
        media.expect_clear().times(0);
        media.expect_delete_by_ids().times(0);
        media.expect_insert_or_replace().times(0);

        let expected = ScanMetadata {
            last_scan_at: 6_000,
            fingerprint: DiffEngine::compute_fingerprint(&[1, 2]),
        };
        let mut metadata = MockMetadata::new();
        metadata.expect_get().returning(|| {
            Ok(Some(ScanMetadata {
                last_scan_at: 5_000,
                fingerprint: String::new(),
            }))
        });
        metadata
            .expect_save()
            .with(eq(expected))
            .times(1)
            .returning(|_| Ok(()));

        let task = task(source, media, metadata, 6_000);

        assert_eq!(
            task.run(&CancellationToken::new()).await,
            TaskOutcome::Success
        );
    }
}
