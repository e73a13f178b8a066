//! Watch-history persistence.
//!
//! The upsert is the only write path. Uniqueness on `(user_id, video_id)`
//! is enforced by the table constraint; concurrent upserts for the same
//! pair serialize on the row and the last committed write wins.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use vflix_models::{IdentityContext, UserId, VideoId, WatchHistory};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct WatchRow {
    id: i64,
    user_id: i64,
    video_id: i64,
    progress: i64,
    updated_at: DateTime<Utc>,
}

impl From<WatchRow> for WatchHistory {
    fn from(row: WatchRow) -> Self {
        WatchHistory {
            id: row.id,
            user_id: UserId(row.user_id),
            video_id: VideoId(row.video_id),
            progress: row.progress,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UpsertRow {
    id: i64,
    user_id: i64,
    video_id: i64,
    progress: i64,
    updated_at: DateTime<Utc>,
    created: bool,
}

/// Persistence for watch-history rows.
#[derive(Clone)]
pub struct WatchHistoryStore {
    pool: PgPool,
}

impl WatchHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update the resume point for `(user, video)`.
    ///
    /// Returns the row plus `true` when a new row was created. Progress is
    /// bounded by the video's duration once the duration is known; progress
    /// equal to the duration is accepted.
    pub async fn upsert(
        &self,
        user_id: UserId,
        video_id: VideoId,
        progress: i64,
    ) -> DbResult<(WatchHistory, bool)> {
        let duration: Option<Option<i64>> =
            sqlx::query_scalar("SELECT duration FROM videos WHERE id = $1")
                .bind(video_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        let duration = match duration {
            None => return Err(DbError::not_found(format!("video {video_id}"))),
            Some(d) => d,
        };

        if let Some(duration) = duration {
            if progress > duration {
                return Err(DbError::ProgressExceedsDuration { progress, duration });
            }
        }

        // (xmax = 0) distinguishes a fresh insert from a conflict-update.
        let row: UpsertRow = sqlx::query_as(
            "INSERT INTO watch_history (user_id, video_id, progress) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, video_id) \
             DO UPDATE SET progress = EXCLUDED.progress, updated_at = NOW() \
             RETURNING id, user_id, video_id, progress, updated_at, (xmax = 0) AS created",
        )
        .bind(user_id.as_i64())
        .bind(video_id.as_i64())
        .bind(progress)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            "Upserted watch history user={} video={} progress={} created={}",
            user_id, video_id, progress, row.created
        );

        let created = row.created;
        let history = WatchHistory {
            id: row.id,
            user_id: UserId(row.user_id),
            video_id: VideoId(row.video_id),
            progress: row.progress,
            updated_at: row.updated_at,
        };
        Ok((history, created))
    }

    /// Rows for one user, newest first, optionally filtered by video.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        video_id: Option<VideoId>,
    ) -> DbResult<Vec<WatchHistory>> {
        let rows: Vec<WatchRow> = match video_id {
            Some(video_id) => {
                sqlx::query_as(
                    "SELECT id, user_id, video_id, progress, updated_at \
                     FROM watch_history WHERE user_id = $1 AND video_id = $2 \
                     ORDER BY updated_at DESC",
                )
                .bind(user_id.as_i64())
                .bind(video_id.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, user_id, video_id, progress, updated_at \
                     FROM watch_history WHERE user_id = $1 \
                     ORDER BY updated_at DESC",
                )
                .bind(user_id.as_i64())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete one row. Restricted to administrators.
    pub async fn delete(&self, id: i64, actor: &IdentityContext) -> DbResult<()> {
        if !actor.is_admin {
            return Err(DbError::forbidden("only admins can delete watch history"));
        }

        let result = sqlx::query("DELETE FROM watch_history WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("watch history {id}")));
        }
        Ok(())
    }

    /// All rows, for the snapshot exporter.
    pub async fn list_all(&self) -> DbResult<Vec<WatchHistory>> {
        let rows: Vec<WatchRow> = sqlx::query_as(
            "SELECT id, user_id, video_id, progress, updated_at FROM watch_history ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn non_admin_delete_is_forbidden_without_touching_sql() {
        // connect_lazy performs no I/O, so the permission check is the only
        // thing this can exercise - which is exactly what it does, since the
        // guard runs before any query.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unreachable")
            .unwrap();
        let store = WatchHistoryStore::new(pool);

        let err = store.delete(1, &IdentityContext::user(7)).await.unwrap_err();
        assert!(matches!(err, DbError::Forbidden(_)));
    }
}
