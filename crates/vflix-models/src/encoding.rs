//! HLS rendition parameters and encoder constants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rendition heights produced for every video, ascending.
pub const RENDITION_HEIGHTS: [u32; 4] = [120, 360, 720, 1080];

/// Video codec for all renditions
pub const VIDEO_CODEC: &str = "h264";
/// H.264 profile
pub const VIDEO_PROFILE: &str = "main";
/// Constant Rate Factor
pub const VIDEO_CRF: u32 = 20;
/// Fixed GOP length (also used as keyint_min)
pub const VIDEO_GOP: u32 = 48;
/// Audio codec
pub const AUDIO_CODEC: &str = "aac";
/// Audio sample rate in Hz
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Audio bitrate
pub const AUDIO_BITRATE: &str = "128k";
/// HLS segment duration in seconds
pub const HLS_SEGMENT_SECONDS: u32 = 10;
/// Frame timestamp used for poster thumbnails
pub const THUMBNAIL_TIMESTAMP: &str = "00:00:01";

/// Rate-control triple for one rendition height (all kbps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RenditionProfile {
    /// Target height in pixels
    pub height: u32,
    /// Video bitrate
    pub bitrate: u32,
    /// Rate-control ceiling
    pub maxrate: u32,
    /// Rate-control buffer
    pub bufsize: u32,
}

impl RenditionProfile {
    /// Look up the rate-control triple for a height.
    ///
    /// Heights outside the standard ladder get the fallback triple.
    pub fn for_height(height: u32) -> Self {
        let (bitrate, maxrate, bufsize) = match height {
            120 => (100, 150, 300),
            360 => (600, 900, 1800),
            720 => (1800, 2500, 5000),
            1080 => (3500, 5000, 10000),
            _ => (1000, 1200, 2000),
        };
        Self {
            height,
            bitrate,
            maxrate,
            bufsize,
        }
    }

    /// The full rendition ladder, heights ascending.
    pub fn ladder() -> Vec<Self> {
        RENDITION_HEIGHTS.iter().map(|&h| Self::for_height(h)).collect()
    }
}

/// Declared-rate bandwidth written into the master playlist, in bits/s.
pub fn master_bandwidth(height: u32) -> u64 {
    height as u64 * 1000 * 2
}
