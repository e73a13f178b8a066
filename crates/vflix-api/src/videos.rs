//! Video operations for the HTTP layer.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use vflix_db::VideoStore;
use vflix_models::{asset_key, CreateVideoRequest, IdentityContext, VideoId, VideoRecord};
use vflix_queue::{DeleteAssetsJob, JobQueue, ProcessVideoJob, QueueError, QueueJob};
use vflix_storage::ObjectStore;

use crate::error::{ApiError, ApiResult};

/// Presigned playback handles for one video.
///
/// Fields stay `None` until the corresponding pipeline stage has produced
/// its artifact; the HTTP layer turns a missing master URL into a 404.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackUrls {
    /// Presigned poster thumbnail URL
    pub thumbnail_url: Option<String>,
    /// Presigned HLS master playlist URL
    pub hls_master_url: Option<String>,
}

/// Video creation, deletion and playback access.
#[derive(Clone)]
pub struct VideoService {
    videos: VideoStore,
    queue: Arc<JobQueue>,
    storage: ObjectStore,
}

impl VideoService {
    pub fn new(videos: VideoStore, queue: Arc<JobQueue>, storage: ObjectStore) -> Self {
        Self {
            videos,
            queue,
            storage,
        }
    }

    /// Generate the storage key the upload flow should write the source to.
    pub fn new_source_key(&self, filename: &str) -> String {
        asset_key::source_key(filename, Utc::now())
    }

    /// Insert a video record and enqueue its ingestion pipeline.
    pub async fn create_video(
        &self,
        _ctx: &IdentityContext,
        req: CreateVideoRequest,
    ) -> ApiResult<VideoRecord> {
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let record = self.videos.create(&req).await?;

        let job = ProcessVideoJob::new(record.id, &record.source_key);
        match self.queue.enqueue(QueueJob::ProcessVideo(job)).await {
            Ok(_) => {}
            Err(QueueError::EnqueueFailed(_)) => {
                // Already in flight for this video; the pipeline is idempotent.
                warn!("ProcessVideo already enqueued for video {}", record.id);
            }
            Err(e) => return Err(e.into()),
        }

        info!("Created video {} from {}", record.id, record.source_key);
        Ok(record)
    }

    /// Fetch one video record.
    pub async fn get_video(&self, _ctx: &IdentityContext, id: VideoId) -> ApiResult<VideoRecord> {
        self.videos
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("video {id}")))
    }

    /// Remove a video record and enqueue the storage sweep for its assets.
    pub async fn delete_video(&self, _ctx: &IdentityContext, id: VideoId) -> ApiResult<()> {
        let keys = self
            .videos
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("video {id}")))?;

        let job = DeleteAssetsJob::new(
            keys.hls_master_key,
            keys.thumbnail_key,
            Some(keys.source_key),
        );
        self.queue.enqueue(QueueJob::DeleteAssets(job)).await?;

        info!("Deleted video {} and enqueued asset sweep", id);
        Ok(())
    }

    /// Presigned playback URLs for one video.
    ///
    /// Keys that have not been produced yet yield `None`.
    pub async fn get_playback_urls(
        &self,
        ctx: &IdentityContext,
        id: VideoId,
    ) -> ApiResult<PlaybackUrls> {
        let record = self.get_video(ctx, id).await?;

        let thumbnail_url = match &record.thumbnail_key {
            Some(key) => Some(self.storage.presign_default(key).await?),
            None => None,
        };
        let hls_master_url = match &record.hls_master_key {
            Some(key) => Some(self.storage.presign_default(key).await?),
            None => None,
        };

        Ok(PlaybackUrls {
            thumbnail_url,
            hls_master_url,
        })
    }
}
