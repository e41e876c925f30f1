//! Media repository trait and SQLite implementation

use crate::error::Result;
use crate::models::MediaRecord;
use async_trait::async_trait;
use sqlx::{query_as, QueryBuilder, Sqlite, SqlitePool};

/// Media repository interface for the persisted index
///
/// Insert-or-replace semantics keyed by item identity: the index holds at
/// most one row per id, and writing an existing id replaces the whole row.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Fetch every persisted record, newest capture first
    async fn get_all(&self) -> Result<Vec<MediaRecord>>;

    /// Find a record by its identity
    async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>>;

    /// Fetch all records in one bucket, newest capture first
    async fn get_by_bucket(&self, bucket: &str) -> Result<Vec<MediaRecord>>;

    /// Insert the batch, replacing any rows that share an identity
    async fn insert_or_replace(&self, records: &[MediaRecord]) -> Result<()>;

    /// Delete the records with the given identities
    ///
    /// # Returns
    /// The number of rows actually removed.
    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64>;

    /// Remove every record from the index
    async fn clear(&self) -> Result<()>;

    /// Count persisted records
    async fn count(&self) -> Result<i64>;

    /// List every persisted identity
    async fn all_ids(&self) -> Result<Vec<i64>>;
}

/// SQLite caps bound variables at 32766 per statement; bulk operations
/// split their input so no single statement exceeds it.
const BIND_LIMIT: usize = 32000;

/// Bound variables per row in the bulk insert statement.
const INSERT_BINDS_PER_ROW: usize = 10;

/// SQLite implementation of MediaRepository
pub struct SqliteMediaRepository {
    pool: SqlitePool,
}

impl SqliteMediaRepository {
    /// Create a new SQLite media repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaRepository for SqliteMediaRepository {
    async fn get_all(&self) -> Result<Vec<MediaRecord>> {
        let records =
            query_as::<_, MediaRecord>("SELECT * FROM media_items ORDER BY date_taken DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(records)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>> {
        let record = query_as::<_, MediaRecord>("SELECT * FROM media_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn get_by_bucket(&self, bucket: &str) -> Result<Vec<MediaRecord>> {
        let records = query_as::<_, MediaRecord>(
            "SELECT * FROM media_items WHERE bucket = ? ORDER BY date_taken DESC",
        )
        .bind(bucket)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn insert_or_replace(&self, records: &[MediaRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Each chunk is one atomic bulk statement, sized to stay under the
        // SQLite bind variable cap; separate chunks remain independent.
        for chunk in records.chunks(BIND_LIMIT / INSERT_BINDS_PER_ROW) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR REPLACE INTO media_items \
                 (id, uri, date_taken, bucket, size, width, height, orientation, mime_type, added_at) ",
            );
            builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.id)
                    .push_bind(&record.uri)
                    .push_bind(record.date_taken)
                    .push_bind(&record.bucket)
                    .push_bind(record.size)
                    .push_bind(record.width)
                    .push_bind(record.height)
                    .push_bind(record.orientation)
                    .push_bind(&record.mime_type)
                    .push_bind(record.added_at);
            });

            builder.build().execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut removed = 0u64;
        for chunk in ids.chunks(BIND_LIMIT) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM media_items WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");

            let result = builder.build().execute(&self.pool).await?;
            removed += result.rows_affected();
        }

        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM media_items")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn all_ids(&self) -> Result<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM media_items")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
