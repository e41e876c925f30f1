//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (media source,
//! condition probe) into the shared sync core: it opens the index database,
//! builds the diff engine and sync task, and hands the host a single
//! [`GalleryCore`] handle that drives scheduling.
//!
//! Every collaborator is constructed explicitly here; there is no service
//! locator or registry behind the façade.

pub mod error;
pub mod logging;

pub use error::{CoreError, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};

use bridge_traits::background::{HostConditions, TaskConstraints};
use bridge_traits::source::MediaSource;
use bridge_traits::time::{Clock, SystemClock};
use core_index::repositories::{
    MediaRepository, ScanMetadataRepository, SqliteMediaRepository, SqliteScanMetadataRepository,
};
use core_index::{create_pool, DatabaseConfig};
use core_sync::scheduler::{BackoffPolicy, SchedulerStatus, SyncScheduler};
use core_sync::{DiffEngine, SyncTask, DEFAULT_STALENESS_WINDOW_MS};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Top-level configuration for the gallery core.
#[derive(Debug, Clone)]
pub struct GalleryCoreConfig {
    /// Index database settings
    pub database: DatabaseConfig,
    /// Age of the last scan beyond which a full resync is forced, in millis
    pub staleness_window_ms: i64,
    /// Interval between periodic sync runs
    pub periodic_interval: Duration,
    /// Flex window passed to the scheduler
    pub periodic_flex: Duration,
    /// Constraints evaluated before each periodic run
    pub constraints: TaskConstraints,
    /// Retry policy applied after failed runs
    pub backoff: BackoffPolicy,
}

impl Default for GalleryCoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            staleness_window_ms: DEFAULT_STALENESS_WINDOW_MS,
            periodic_interval: Duration::from_secs(3 * 60 * 60),
            periodic_flex: Duration::from_secs(30 * 60),
            constraints: TaskConstraints::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct GalleryCore {
    media: Arc<dyn MediaRepository>,
    scheduler: Arc<SyncScheduler>,
    config: GalleryCoreConfig,
}

impl GalleryCore {
    /// Open the index database and assemble the sync pipeline.
    ///
    /// `source` is the host's media enumerator; `conditions` is its optional
    /// probe for the declarative constraints. Desktop hosts typically pass
    /// `bridge_desktop::FileSystemMediaSource` and
    /// `bridge_desktop::DesktopConditions`.
    pub async fn bootstrap(
        config: GalleryCoreConfig,
        source: Arc<dyn MediaSource>,
        conditions: Option<Arc<dyn HostConditions>>,
    ) -> Result<Self> {
        info!("Bootstrapping gallery core");

        let pool = create_pool(config.database.clone()).await?;
        let media: Arc<dyn MediaRepository> = Arc::new(SqliteMediaRepository::new(pool.clone()));
        let metadata: Arc<dyn ScanMetadataRepository> =
            Arc::new(SqliteScanMetadataRepository::new(pool));

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let engine = DiffEngine::with_staleness_window(
            Arc::clone(&clock),
            config.staleness_window_ms,
        );

        let task = SyncTask::new(
            source,
            Arc::clone(&media),
            metadata,
            engine,
            Arc::clone(&clock),
        );

        let scheduler = Arc::new(SyncScheduler::new(
            Arc::new(task),
            conditions,
            config.backoff.clone(),
            clock,
        ));

        Ok(Self {
            media,
            scheduler,
            config,
        })
    }

    /// Start the periodic sync using the configured interval and constraints.
    ///
    /// Idempotent: an already active schedule is kept as-is.
    pub async fn start(&self) {
        self.scheduler
            .schedule_periodic(
                self.config.periodic_interval,
                self.config.periodic_flex,
                self.config.constraints.clone(),
            )
            .await;
    }

    /// Trigger one sync run right now, independent of the periodic schedule.
    pub async fn sync_now(&self) {
        self.scheduler.schedule_immediate().await;
    }

    /// Current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        self.scheduler.status().await
    }

    /// Stop the periodic schedule and cancel in-flight runs.
    pub async fn stop(&self) {
        self.scheduler.cancel().await;
    }

    /// Read access to the persisted index for host query surfaces.
    pub fn media(&self) -> Arc<dyn MediaRepository> {
        Arc::clone(&self.media)
    }

    /// The configuration this core was bootstrapped with.
    pub fn config(&self) -> &GalleryCoreConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::source::MediaItem;
    use core_sync::TaskOutcome;

    struct StubSource(Vec<MediaItem>);

    #[async_trait]
    impl MediaSource for StubSource {
        async fn snapshot(&self) -> BridgeResult<Vec<MediaItem>> {
            Ok(self.0.clone())
        }
    }

    fn test_config() -> GalleryCoreConfig {
        GalleryCoreConfig {
            database: DatabaseConfig::in_memory(),
            ..GalleryCoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_and_sync_now() {
        let source = Arc::new(StubSource(vec![MediaItem {
            id: 1,
            uri: "file:///pictures/a.jpg".to_string(),
            date_taken: 10,
            bucket: "pictures".to_string(),
            size: 100,
        }]));

        let core = GalleryCore::bootstrap(test_config(), source, None)
            .await
            .unwrap();

        core.sync_now().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(core.media().count().await.unwrap(), 1);
        assert_eq!(core.status().await.last_outcome, Some(TaskOutcome::Success));
    }

    #[tokio::test]
    async fn test_bootstrap_with_desktop_bridges() {
        use bridge_desktop::{DesktopConditions, FileSystemMediaSource};

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"aaaa").unwrap();
        std::fs::write(dir.path().join("b.png"), b"bb").unwrap();

        let source = Arc::new(FileSystemMediaSource::new(dir.path()));
        let conditions: Arc<dyn HostConditions> = Arc::new(DesktopConditions::new());

        let core = GalleryCore::bootstrap(test_config(), source, Some(conditions))
            .await
            .unwrap();

        core.sync_now().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(core.media().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let source = Arc::new(StubSource(Vec::new()));
        let core = GalleryCore::bootstrap(test_config(), source, None)
            .await
            .unwrap();

        core.start().await;
        core.start().await;

        assert!(core.status().await.periodic_active);
        core.stop().await;
        assert!(!core.status().await.periodic_active);
    }
}
