//! Scan metadata repository trait and SQLite implementation

use crate::error::Result;
use crate::models::ScanMetadata;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Scan metadata repository interface
///
/// The table holds exactly one logical row (id = 1). Saving replaces the
/// row in place; there is no history.
#[async_trait]
pub trait ScanMetadataRepository: Send + Sync {
    /// Fetch the last successful scan's metadata, if any scan has completed
    async fn get(&self) -> Result<Option<ScanMetadata>>;

    /// Save metadata for a completed scan, replacing the previous row
    async fn save(&self, metadata: &ScanMetadata) -> Result<()>;
}

/// SQLite implementation of ScanMetadataRepository
pub struct SqliteScanMetadataRepository {
    pool: SqlitePool,
}

impl SqliteScanMetadataRepository {
    /// Create a new SQLite scan metadata repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanMetadataRepository for SqliteScanMetadataRepository {
    async fn get(&self) -> Result<Option<ScanMetadata>> {
        let metadata = query_as::<_, ScanMetadata>(
            "SELECT last_scan_at, fingerprint FROM scan_metadata WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(metadata)
    }

    async fn save(&self, metadata: &ScanMetadata) -> Result<()> {
        sqlx::query(
            "INSERT INTO scan_metadata (id, last_scan_at, fingerprint) VALUES (1, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET last_scan_at = excluded.last_scan_at, \
             fingerprint = excluded.fingerprint",
        )
        .bind(metadata.last_scan_at)
        .bind(&metadata.fingerprint)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_get_before_first_scan() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteScanMetadataRepository::new(pool);

        assert!(repo.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteScanMetadataRepository::new(pool);

        let metadata = ScanMetadata {
            last_scan_at: 1_700_000_000_000,
            fingerprint: "abc123".to_string(),
        };
        repo.save(&metadata).await.unwrap();

        let found = repo.get().await.unwrap().unwrap();
        assert_eq!(found, metadata);
    }

    #[tokio::test]
    async fn test_save_replaces_single_row() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteScanMetadataRepository::new(pool.clone());

        repo.save(&ScanMetadata {
            last_scan_at: 1,
            fingerprint: "first".to_string(),
        })
        .await
        .unwrap();
        repo.save(&ScanMetadata {
            last_scan_at: 2,
            fingerprint: "second".to_string(),
        })
        .await
        .unwrap();

        let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scan_metadata")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows.0, 1);

        let found = repo.get().await.unwrap().unwrap();
        assert_eq!(found.last_scan_at, 2);
        assert_eq!(found.fingerprint, "second");
    }
}
