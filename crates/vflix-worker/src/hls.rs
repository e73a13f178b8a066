//! HLS stage: transcode every rendition, sign playlists, upload, finalize.
//!
//! Ordering inside the stage: all variants (and their segments) are
//! uploaded before the master playlist, and the record's master key is
//! written only after the master object exists. A crash at any point
//! leaves either no master key (stage re-runs) or a fully consistent set.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use vflix_media::{
    build_master_playlist, probe_video, segment_lines, sign_variant_playlist, transcode_rendition,
};
use vflix_models::{asset_key, VideoId, RENDITION_HEIGHTS};
use vflix_storage::TempFile;

use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::probe::suffix_of;
use crate::retry::{retry_async, RetryConfig};

/// Produce the full rendition set plus signed master playlist for a video.
///
/// Returns the master playlist key. Fast-idempotent: a populated master
/// key whose object exists short-circuits the stage.
pub async fn run_transcode_hls(
    ctx: &ProcessingContext,
    video_id: VideoId,
    source_key: &str,
    base: &str,
) -> WorkerResult<String> {
    let master_key = asset_key::hls_master_key(base);

    if let Some(record) = ctx.videos.get(video_id).await? {
        if let Some(existing) = &record.hls_master_key {
            if ctx.storage.exists(existing).await.unwrap_or(false) {
                debug!("Video {} already has HLS set at {}, skipping", video_id, existing);
                return Ok(existing.clone());
            }
        }
    }

    // Stage the source locally.
    let local_input = TempFile::with_suffix(&suffix_of(source_key))?;
    ctx.storage.get(source_key, local_input.path()).await?;

    // Budget: the configured stage timeout, or three times the source
    // duration once known, whichever is larger.
    let budget = stage_budget(ctx, local_input.path()).await;
    let deadline = Instant::now() + budget;

    let out_dir = tempfile::tempdir()?;

    // Transcode every rendition height, sharing the stage budget.
    for height in RENDITION_HEIGHTS {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or_default()
            .as_secs();
        if remaining == 0 {
            return Err(WorkerError::StageTimeout(budget.as_secs()));
        }

        transcode_rendition(
            local_input.path(),
            out_dir.path(),
            base,
            height,
            remaining,
            Some(ctx.cancel_rx.clone()),
        )
        .await?;
    }

    // Rewrite each variant playlist with presigned segment URLs.
    for height in RENDITION_HEIGHTS {
        let playlist_path = out_dir.path().join(asset_key::variant_playlist_name(base, height));
        let content = tokio::fs::read_to_string(&playlist_path).await?;

        let mut signed_urls = HashMap::new();
        for segment in segment_lines(&content) {
            let key = asset_key::hls_segment_key(base, &segment);
            let url = ctx
                .storage
                .presign(&key, ctx.storage.presign_ttl())
                .await?;
            signed_urls.insert(segment, url);
        }

        sign_variant_playlist(&playlist_path, |segment| signed_urls.get(segment).cloned())
            .await?;
    }

    // Master playlist referencing presigned variant URLs, heights ascending.
    let mut entries = Vec::with_capacity(RENDITION_HEIGHTS.len());
    for height in RENDITION_HEIGHTS {
        let variant_key =
            asset_key::hls_segment_key(base, &asset_key::variant_playlist_name(base, height));
        let url = ctx
            .storage
            .presign(&variant_key, ctx.storage.presign_ttl())
            .await?;
        entries.push((height, url));
    }
    let master_name = format!("{base}_master.m3u8");
    let master_path = out_dir.path().join(&master_name);
    tokio::fs::write(&master_path, build_master_playlist(&entries)).await?;

    // Upload segments and variant playlists first, the master strictly last.
    let mut uploads: Vec<String> = Vec::new();
    let mut dir = tokio::fs::read_dir(out_dir.path()).await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name != master_name {
            uploads.push(name);
        }
    }
    uploads.sort();

    let upload_retry = RetryConfig::new("hls_upload").with_base_delay(Duration::from_millis(250));
    for name in &uploads {
        let local = out_dir.path().join(name);
        let key = asset_key::hls_segment_key(base, name);
        retry_async(&upload_retry, || ctx.storage.put(&local, &key)).await?;
    }
    retry_async(&upload_retry, || {
        ctx.storage.put(&master_path, &master_key)
    })
    .await?;

    // Final step: publish the stable handle on the record.
    ctx.videos.set_hls_master_key(video_id, &master_key).await?;
    if ctx.videos.mark_ready_if_complete(video_id).await? {
        info!("Video {} is ready", video_id);
    }

    info!(
        "Uploaded HLS set for video {} ({} files) under {}",
        video_id,
        uploads.len() + 1,
        asset_key::hls_prefix(base)
    );
    Ok(master_key)
}

/// `max(stage_timeout, 3 * duration)`; the plain stage timeout when the
/// local probe cannot produce a duration.
async fn stage_budget(ctx: &ProcessingContext, input: &Path) -> Duration {
    let base = ctx.config.stage_timeout;
    match probe_video(input).await {
        Ok(info) if info.duration > 0.0 => {
            let scaled = Duration::from_secs((info.duration * 3.0).ceil() as u64);
            base.max(scaled)
        }
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use vflix_models::asset_key;

    #[test]
    fn variant_keys_live_under_the_video_prefix() {
        let key = asset_key::hls_segment_key("clip", &asset_key::variant_playlist_name("clip", 360));
        assert_eq!(key, "hls/clip/clip_360p.m3u8");
        assert!(key.starts_with(&asset_key::hls_prefix("clip")));
    }
}
