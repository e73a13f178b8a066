//! Poster thumbnail extraction.

use std::path::Path;

use tokio::sync::watch;

use vflix_models::encoding::THUMBNAIL_TIMESTAMP;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Extract a single poster frame from a video file.
pub async fn extract_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    timeout_secs: u64,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path.as_ref(), output_path.as_ref())
        .input_arg("-ss")
        .input_arg(THUMBNAIL_TIMESTAMP)
        .single_frame();

    let mut runner = FfmpegRunner::new().with_timeout(timeout_secs);
    if let Some(rx) = cancel_rx {
        runner = runner.with_cancel(rx);
    }
    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_command_seeks_before_decode() {
        let cmd = FfmpegCommand::new("in.mp4", "out.jpg")
            .input_arg("-ss")
            .input_arg(THUMBNAIL_TIMESTAMP)
            .single_frame();
        let args = cmd.build_args();
        assert!(args.contains(&"00:00:01".to_string()));
        assert!(args.contains(&"-vframes".to_string()));
    }
}
