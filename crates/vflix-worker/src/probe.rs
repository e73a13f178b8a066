//! Probe stage: read the source duration and write it to the record.

use tracing::{debug, info};

use vflix_media::probe_duration;
use vflix_models::VideoId;
use vflix_storage::TempFile;

use crate::context::ProcessingContext;
use crate::error::WorkerResult;

/// Probe the source object and set the video's duration.
///
/// Fast-idempotent: a record that already carries a duration is left
/// untouched. The probe truncates to whole seconds; a zero-duration or
/// unreadable source surfaces as invalid input.
pub async fn run_probe(
    ctx: &ProcessingContext,
    video_id: VideoId,
    source_key: &str,
) -> WorkerResult<i64> {
    if let Some(record) = ctx.videos.get(video_id).await? {
        if let Some(duration) = record.duration {
            debug!("Video {} already probed ({}s), skipping", video_id, duration);
            return Ok(duration);
        }
    }

    let local = TempFile::with_suffix(&suffix_of(source_key))?;
    ctx.storage.get(source_key, local.path()).await?;

    let duration = probe_duration(local.path()).await?;
    ctx.videos.set_duration(video_id, duration).await?;

    info!("Probed video {}: {}s", video_id, duration);
    Ok(duration)
}

/// Extension of a key including the dot, defaulting to `.mp4`.
pub(crate) fn suffix_of(key: &str) -> String {
    let filename = key.rsplit('/').next().unwrap_or(key);
    match filename.rfind('.') {
        Some(idx) => filename[idx..].to_string(),
        None => ".mp4".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_extraction() {
        assert_eq!(suffix_of("videos/clip_1700000000_ab12cd3.mp4"), ".mp4");
        assert_eq!(suffix_of("videos/movie.webm"), ".webm");
        assert_eq!(suffix_of("videos/noext"), ".mp4");
    }
}
