//! Video row persistence.
//!
//! Every stage update writes only the column that stage owns, so sibling
//! completions commute. `ready` is reached exclusively through
//! `mark_ready_if_complete`, which checks the derived predicate in SQL.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};

use vflix_models::{CreateVideoRequest, VideoId, VideoRecord, VideoStatus};

use crate::error::DbResult;

#[derive(Debug, FromRow)]
struct VideoRow {
    id: i64,
    title: String,
    description: Option<String>,
    genre: String,
    source_key: String,
    duration: Option<i64>,
    thumbnail_key: Option<String>,
    hls_master_key: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRow> for VideoRecord {
    fn from(row: VideoRow) -> Self {
        let status = row.status.parse::<VideoStatus>().unwrap_or_else(|_| {
            warn!("video {} has unknown status '{}'", row.id, row.status);
            VideoStatus::Pending
        });
        VideoRecord {
            id: VideoId(row.id),
            title: row.title,
            description: row.description,
            genre: row.genre,
            source_key: row.source_key,
            duration: row.duration,
            thumbnail_key: row.thumbnail_key,
            hls_master_key: row.hls_master_key,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const VIDEO_COLUMNS: &str = "id, title, description, genre, source_key, duration, \
     thumbnail_key, hls_master_key, status, created_at, updated_at";

/// Keys a deleted video leaves behind for the asset sweep.
#[derive(Debug, Clone, FromRow)]
pub struct DeletedVideoKeys {
    pub source_key: String,
    pub thumbnail_key: Option<String>,
    pub hls_master_key: Option<String>,
}

/// Persistence for video rows.
#[derive(Clone)]
pub struct VideoStore {
    pool: PgPool,
}

impl VideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new video row in `pending` state.
    pub async fn create(&self, req: &CreateVideoRequest) -> DbResult<VideoRecord> {
        let row: VideoRow = sqlx::query_as(&format!(
            "INSERT INTO videos (title, description, genre, source_key) \
             VALUES ($1, $2, $3, $4) RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.genre)
        .bind(&req.source_key)
        .fetch_one(&self.pool)
        .await?;

        debug!("Created video {} for source {}", row.id, req.source_key);
        Ok(row.into())
    }

    /// Fetch one video.
    pub async fn get(&self, id: VideoId) -> DbResult<Option<VideoRecord>> {
        let row: Option<VideoRow> =
            sqlx::query_as(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    /// Set the probed duration (probe stage owns this column).
    pub async fn set_duration(&self, id: VideoId, duration: i64) -> DbResult<()> {
        sqlx::query("UPDATE videos SET duration = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .bind(duration)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set the thumbnail key (thumbnail stage owns this column).
    pub async fn set_thumbnail_key(&self, id: VideoId, key: &str) -> DbResult<()> {
        sqlx::query("UPDATE videos SET thumbnail_key = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set the HLS master key (HLS stage owns this column).
    pub async fn set_hls_master_key(&self, id: VideoId, key: &str) -> DbResult<()> {
        sqlx::query("UPDATE videos SET hls_master_key = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Terminal failure transition. Partial assets stay for the GC sweep.
    pub async fn mark_failed(&self, id: VideoId) -> DbResult<()> {
        sqlx::query("UPDATE videos SET status = 'failed', updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Promote to `ready` when every derived field is populated.
    ///
    /// Returns true when the transition happened on this call.
    pub async fn mark_ready_if_complete(&self, id: VideoId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE videos SET status = 'ready', updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
               AND duration IS NOT NULL \
               AND thumbnail_key IS NOT NULL \
               AND hls_master_key IS NOT NULL",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a video row, returning the asset keys for the storage sweep.
    pub async fn delete(&self, id: VideoId) -> DbResult<Option<DeletedVideoKeys>> {
        let keys: Option<DeletedVideoKeys> = sqlx::query_as(
            "DELETE FROM videos WHERE id = $1 \
             RETURNING source_key, thumbnail_key, hls_master_key",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(keys)
    }

    /// All rows, for the snapshot exporter.
    pub async fn list_all(&self) -> DbResult<Vec<VideoRecord>> {
        let rows: Vec<VideoRow> =
            sqlx::query_as(&format!("SELECT {VIDEO_COLUMNS} FROM videos ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// Integration coverage for this store lives in tests/db_integration.rs;
// the queries need a live Postgres.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_falls_back_to_pending() {
        let row = VideoRow {
            id: 1,
            title: "Clip".into(),
            description: None,
            genre: "drama".into(),
            source_key: "videos/clip_1700000000_ab12cd3.mp4".into(),
            duration: None,
            thumbnail_key: None,
            hls_master_key: None,
            status: "mystery".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let record: VideoRecord = row.into();
        assert_eq!(record.status, VideoStatus::Pending);
    }
}
