//! Thumbnail stage: extract and upload the poster frame.

use tracing::{debug, info};

use vflix_media::extract_thumbnail;
use vflix_models::{asset_key, VideoId};
use vflix_storage::TempFile;

use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::probe::suffix_of;

/// Produce `thumbnails/{base}.jpg` and record its key.
///
/// Fast-idempotent: when the record already points at a thumbnail and the
/// object is present in storage, the stage completes without re-encoding.
pub async fn run_thumbnail(
    ctx: &ProcessingContext,
    video_id: VideoId,
    source_key: &str,
    base: &str,
) -> WorkerResult<String> {
    let thumb_key = asset_key::thumbnail_key(base);

    if let Some(record) = ctx.videos.get(video_id).await? {
        if let Some(existing) = &record.thumbnail_key {
            if ctx.storage.exists(existing).await.unwrap_or(false) {
                debug!("Video {} already has thumbnail {}, skipping", video_id, existing);
                return Ok(existing.clone());
            }
        }
    }

    let local_video = TempFile::with_suffix(&suffix_of(source_key))?;
    let local_thumb = TempFile::with_suffix(".jpg")?;

    ctx.storage.get(source_key, local_video.path()).await?;
    extract_thumbnail(
        local_video.path(),
        local_thumb.path(),
        ctx.config.stage_timeout.as_secs(),
        Some(ctx.cancel_rx.clone()),
    )
    .await?;
    ctx.storage.put(local_thumb.path(), &thumb_key).await?;

    ctx.videos.set_thumbnail_key(video_id, &thumb_key).await?;
    if ctx.videos.mark_ready_if_complete(video_id).await? {
        info!("Video {} is ready", video_id);
    }

    info!("Uploaded thumbnail {} for video {}", thumb_key, video_id);
    Ok(thumb_key)
}
