//! Asset sweep for deleted videos.

use tracing::{info, warn};

use vflix_models::asset_key;
use vflix_queue::DeleteAssetsJob;

use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::export;

/// Remove every stored asset of a deleted video.
///
/// The HLS prefix sweep covers the master playlist, variants and segments;
/// missing objects and empty prefixes succeed with no effect. A Video
/// snapshot is exported afterwards so the analytics data reflects the
/// deletion.
pub async fn run_delete_assets(ctx: &ProcessingContext, job: &DeleteAssetsJob) -> WorkerResult<()> {
    if let Some(master_key) = &job.hls_master_key {
        let prefix = asset_key::hls_prefix_of_master(master_key);
        let removed = ctx.storage.delete_prefix(&prefix).await?;
        info!("Swept {} objects under {}", removed, prefix);
    }

    if let Some(thumbnail_key) = &job.thumbnail_key {
        ctx.storage.delete_object(thumbnail_key).await?;
    }

    if let Some(source_key) = &job.source_key {
        ctx.storage.delete_object(source_key).await?;
    }

    // Analytics export is best-effort on top of the sweep.
    if let Err(e) = export::export_videos(ctx).await {
        warn!("Video snapshot export after deletion failed: {}", e);
    }

    Ok(())
}
