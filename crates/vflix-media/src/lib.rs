//! FFmpeg CLI wrapper for video processing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Cancellation (SIGTERM, then SIGKILL after a grace period) and timeouts
//! - Duration probing via ffprobe
//! - Poster thumbnail extraction
//! - HLS renditioning: per-height transcode, variant playlist signing,
//!   master playlist construction

pub mod command;
pub mod error;
pub mod hls;
pub mod probe;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use hls::{
    build_master_playlist, rewrite_segment_lines, segment_lines, sign_variant_playlist,
    transcode_rendition,
};
pub use probe::{probe_duration, probe_video, VideoInfo};
pub use thumbnail::extract_thumbnail;
