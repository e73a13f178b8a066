//! HLS renditioning.
//!
//! For each rendition height the encoder produces a variant playlist
//! `{base}_{H}p.m3u8` plus `{base}_{H}p_NNN.ts` segments. Variant playlists
//! are rewritten with presigned segment URLs before upload, and the master
//! playlist is generated directly with presigned variant URLs, so only the
//! signed form ever reaches storage.

use std::path::{Path, PathBuf};

use tokio::sync::watch;
use tracing::info;

use vflix_models::encoding::{
    master_bandwidth, RenditionProfile, AUDIO_BITRATE, AUDIO_CODEC, AUDIO_SAMPLE_RATE,
    HLS_SEGMENT_SECONDS, VIDEO_CODEC, VIDEO_CRF, VIDEO_GOP, VIDEO_PROFILE,
};
use vflix_models::{segment_name, variant_playlist_name};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Transcode one rendition height to HLS inside `out_dir`.
///
/// Returns the path of the produced variant playlist.
pub async fn transcode_rendition(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    base: &str,
    height: u32,
    timeout_secs: u64,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let profile = RenditionProfile::for_height(height);
    let playlist_path = out_dir.join(variant_playlist_name(base, height));
    let segment_template = out_dir.join(format!("{base}_{height}p_%03d.ts"));

    let cmd = FfmpegCommand::new(input, &playlist_path)
        .video_filter(format!("scale=-2:{height}"))
        .audio_codec(AUDIO_CODEC)
        .video_codec(VIDEO_CODEC)
        .output_args([
            "-ar".to_string(),
            AUDIO_SAMPLE_RATE.to_string(),
            "-b:a".to_string(),
            AUDIO_BITRATE.to_string(),
            "-profile:v".to_string(),
            VIDEO_PROFILE.to_string(),
            "-crf".to_string(),
            VIDEO_CRF.to_string(),
            "-sc_threshold".to_string(),
            "0".to_string(),
            "-g".to_string(),
            VIDEO_GOP.to_string(),
            "-keyint_min".to_string(),
            VIDEO_GOP.to_string(),
            "-hls_time".to_string(),
            HLS_SEGMENT_SECONDS.to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-b:v".to_string(),
            format!("{}k", profile.bitrate),
            "-maxrate".to_string(),
            format!("{}k", profile.maxrate),
            "-bufsize".to_string(),
            format!("{}k", profile.bufsize),
            "-hls_segment_filename".to_string(),
            segment_template.to_string_lossy().to_string(),
        ]);

    let mut runner = FfmpegRunner::new().with_timeout(timeout_secs);
    if let Some(rx) = cancel_rx {
        runner = runner.with_cancel(rx);
    }
    runner.run(&cmd).await?;

    info!(
        "Transcoded {} to {}p rendition at {}",
        input.display(),
        height,
        playlist_path.display()
    );

    Ok(playlist_path)
}

/// Extract the segment filenames referenced by a variant playlist.
pub fn segment_lines(playlist: &str) -> Vec<String> {
    playlist
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with(".ts"))
        .map(str::to_string)
        .collect()
}

/// Replace every `.ts` segment line with the URL the resolver returns.
///
/// Lines the resolver declines are left untouched. All other lines pass
/// through verbatim; output lines are `\n`-terminated.
pub fn rewrite_segment_lines<F>(playlist: &str, mut resolver: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(playlist.len());
    for line in playlist.lines() {
        let trimmed = line.trim();
        if trimmed.ends_with(".ts") {
            match resolver(trimmed) {
                Some(url) => out.push_str(&url),
                None => out.push_str(line),
            }
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Rewrite a variant playlist on disk with presigned segment URLs.
pub async fn sign_variant_playlist<F>(path: impl AsRef<Path>, resolver: F) -> MediaResult<()>
where
    F: FnMut(&str) -> Option<String>,
{
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let signed = rewrite_segment_lines(&content, resolver);
    tokio::fs::write(path, signed).await?;
    Ok(())
}

/// Build the master playlist text from `(height, variant_url)` entries.
///
/// Entries must be supplied heights ascending. RESOLUTION deliberately
/// writes a literal 1920 width for every rendition (legacy format kept
/// bit-stable for existing players).
pub fn build_master_playlist(entries: &[(u32, String)]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for (height, url) in entries {
        out.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION=1920x{}\n",
            master_bandwidth(*height),
            height
        ));
        out.push_str(url);
        out.push('\n');
    }
    out
}

/// Expected first-segment filename for a rendition (used by idempotency checks).
pub fn first_segment_name(base: &str, height: u32) -> String {
    segment_name(base, height, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:10\n\
#EXTINF:10.000000,\n\
clip_720p_000.ts\n\
#EXTINF:4.500000,\n\
clip_720p_001.ts\n\
#EXT-X-ENDLIST\n";

    #[test]
    fn segment_lines_finds_only_ts_entries() {
        let segments = segment_lines(PLAYLIST);
        assert_eq!(segments, vec!["clip_720p_000.ts", "clip_720p_001.ts"]);
    }

    #[test]
    fn rewrite_replaces_segments_and_keeps_tags() {
        let signed = rewrite_segment_lines(PLAYLIST, |name| {
            Some(format!("https://store.example/hls/clip/{name}?sig=abc"))
        });

        assert!(signed.contains("#EXT-X-TARGETDURATION:10\n"));
        assert!(signed.contains("https://store.example/hls/clip/clip_720p_000.ts?sig=abc\n"));
        assert!(signed.contains("https://store.example/hls/clip/clip_720p_001.ts?sig=abc\n"));
        assert!(!signed.contains("\nclip_720p_000.ts\n"));
    }

    #[test]
    fn rewrite_leaves_unresolved_lines_alone() {
        let signed = rewrite_segment_lines(PLAYLIST, |_| None);
        assert_eq!(signed, PLAYLIST);
    }

    #[test]
    fn master_playlist_format() {
        let entries = vec![
            (120u32, "https://s/clip_120p.m3u8?sig=a".to_string()),
            (360u32, "https://s/clip_360p.m3u8?sig=b".to_string()),
        ];
        let master = build_master_playlist(&entries);

        let expected = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=240000,RESOLUTION=1920x120\n\
https://s/clip_120p.m3u8?sig=a\n\
#EXT-X-STREAM-INF:BANDWIDTH=720000,RESOLUTION=1920x360\n\
https://s/clip_360p.m3u8?sig=b\n";
        assert_eq!(master, expected);
    }

    #[test]
    fn rendition_command_carries_encoder_contract() {
        // Build the same command transcode_rendition builds and inspect it.
        let profile = RenditionProfile::for_height(720);
        assert_eq!(profile.bitrate, 1800);

        let cmd = FfmpegCommand::new("in.mp4", "out/clip_720p.m3u8")
            .video_filter("scale=-2:720")
            .output_args(["-hls_time", "10"])
            .output_args(["-b:v", "1800k"]);
        let args = cmd.build_args();
        assert!(args.contains(&"scale=-2:720".to_string()));
        assert!(args.contains(&"-hls_time".to_string()));
        assert!(args.contains(&"1800k".to_string()));
    }

    #[test]
    fn first_segment_names() {
        assert_eq!(first_segment_name("clip", 120), "clip_120p_000.ts");
        assert_eq!(first_segment_name("clip", 1080), "clip_1080p_000.ts");
    }
}
