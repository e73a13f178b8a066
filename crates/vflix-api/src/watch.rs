//! Watch-progress operations for the HTTP layer.

use std::sync::Arc;

use tracing::{debug, warn};

use vflix_db::WatchHistoryStore;
use vflix_models::{IdentityContext, SnapshotEntity, VideoId, WatchHistory};
use vflix_queue::{ExportSnapshotJob, JobQueue, QueueError, QueueJob};

use crate::error::ApiResult;

/// Per-user resume points.
#[derive(Clone)]
pub struct WatchProgressService {
    history: WatchHistoryStore,
    queue: Arc<JobQueue>,
}

impl WatchProgressService {
    pub fn new(history: WatchHistoryStore, queue: Arc<JobQueue>) -> Self {
        Self { history, queue }
    }

    /// Record the caller's resume point for a video.
    ///
    /// Returns the row plus whether it was newly created. Every write also
    /// triggers a change-driven snapshot export; the exporter's rate gate
    /// collapses these to at most one per hour.
    pub async fn update_progress(
        &self,
        ctx: &IdentityContext,
        video_id: VideoId,
        progress: i64,
    ) -> ApiResult<(WatchHistory, bool)> {
        let (row, created) = self
            .history
            .upsert(ctx.user_id, video_id, progress)
            .await?;

        let job = ExportSnapshotJob::new(SnapshotEntity::WatchHistory).throttled();
        match self.queue.enqueue(QueueJob::ExportSnapshot(job)).await {
            Ok(_) => {}
            Err(QueueError::EnqueueFailed(_)) => {
                debug!("Watch-history export already in flight");
            }
            Err(e) => {
                // The progress write is the operation; the export trigger is
                // best-effort on top of it.
                warn!("Failed to enqueue watch-history export: {}", e);
            }
        }

        Ok((row, created))
    }

    /// The caller's history, newest first, optionally for one video.
    pub async fn list(
        &self,
        ctx: &IdentityContext,
        video_id: Option<VideoId>,
    ) -> ApiResult<Vec<WatchHistory>> {
        Ok(self.history.list_for_user(ctx.user_id, video_id).await?)
    }

    /// Delete one row; restricted to administrators.
    pub async fn delete(&self, ctx: &IdentityContext, id: i64) -> ApiResult<()> {
        self.history.delete(id, ctx).await?;
        Ok(())
    }
}
