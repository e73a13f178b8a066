//! Shared data models for the VFlix backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and ids
//! - Watch-history rows
//! - Storage asset keys and their derivation rules
//! - HLS rendition parameters and encoding constants
//! - The error taxonomy shared across crates
//! - Snapshot capability for the analytics exporter
//! - Caller identity context

pub mod asset_key;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod job;
pub mod snapshot;
pub mod video;
pub mod watch;

// Re-export common types
pub use asset_key::{
    base_from_filename, base_from_key, export_key, hls_master_key, hls_prefix,
    hls_prefix_of_master, hls_segment_key, segment_name, source_key, thumbnail_key,
    variant_playlist_name,
};
pub use encoding::{
    master_bandwidth, RenditionProfile, AUDIO_BITRATE, AUDIO_SAMPLE_RATE, HLS_SEGMENT_SECONDS,
    RENDITION_HEIGHTS, THUMBNAIL_TIMESTAMP, VIDEO_CRF, VIDEO_GOP,
};
pub use error::ErrorKind;
pub use identity::{IdentityContext, UserId};
pub use job::JobId;
pub use snapshot::{Snapshot, SnapshotEntity};
pub use video::{CreateVideoRequest, VideoId, VideoRecord, VideoStatus};
pub use watch::WatchHistory;
