//! ProcessVideo orchestration.
//!
//! Decomposes a freshly uploaded source into the stage jobs. The probe
//! runs synchronously here so the duration is on the record before the
//! HLS stage finalizes; the thumbnail and HLS stages are independent
//! children consumed by any worker.

use tracing::{info, warn};

use vflix_models::{asset_key, ErrorKind};
use vflix_queue::{ProcessVideoJob, QueueError, QueueJob, ThumbnailJob, TranscodeHlsJob};

use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::export;
use crate::probe::run_probe;

/// Handle a `ProcessVideo` job: probe, then fan out the children.
///
/// Returns once the children are enqueued; it never blocks on their
/// completion. A probe that fails on invalid input marks the record
/// failed but still fans out, matching the rule that the pipeline
/// continues with a null duration (the children fail on the same
/// unreadable source on their own).
pub async fn run_process_video(ctx: &ProcessingContext, job: &ProcessVideoJob) -> WorkerResult<()> {
    match run_probe(ctx, job.video_id, &job.source_key).await {
        Ok(duration) => {
            info!("Video {} probed at {}s", job.video_id, duration);
        }
        Err(e) if e.kind() == ErrorKind::InputInvalid => {
            warn!(
                "Probe rejected source for video {}: {}; continuing without duration",
                job.video_id, e
            );
            ctx.videos.mark_failed(job.video_id).await?;
        }
        Err(e) => return Err(e),
    }

    let base = asset_key::base_from_key(&job.source_key);

    enqueue_child(
        ctx,
        QueueJob::Thumbnail(ThumbnailJob::new(job.video_id, &job.source_key, &base)),
    )
    .await?;
    enqueue_child(
        ctx,
        QueueJob::TranscodeHls(TranscodeHlsJob::new(job.video_id, &job.source_key, &base)),
    )
    .await?;

    // Snapshot the catalog so a new upload shows up in the exports.
    if let Err(e) = export::export_videos(ctx).await {
        warn!("Video snapshot export after enqueue failed: {}", e);
    }

    info!(
        "Enqueued thumbnail + HLS for video {} (base '{}')",
        job.video_id, base
    );
    Ok(())
}

/// Enqueue a child stage; a duplicate already in flight is fine.
async fn enqueue_child(ctx: &ProcessingContext, job: QueueJob) -> WorkerResult<()> {
    match ctx.queue.enqueue(job).await {
        Ok(_) => Ok(()),
        Err(QueueError::EnqueueFailed(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
