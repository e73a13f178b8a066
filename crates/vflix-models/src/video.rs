//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Unique identifier for a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub i64);

impl VideoId {
    /// Get the inner value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VideoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Stored ingestion state of a video.
///
/// `Ready` is only ever reached through the derived predicate: duration,
/// thumbnail key and HLS master key are all populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Upload received, pipeline not finished
    #[default]
    Pending,
    /// All derived fields populated
    Ready,
    /// A stage hit a terminal error
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VideoStatus::Pending),
            "ready" => Ok(VideoStatus::Ready),
            "failed" => Ok(VideoStatus::Failed),
            other => Err(format!("unknown video status: {other}")),
        }
    }
}

/// A video row.
///
/// `source_key` is set at creation and thereafter read-only. The derived
/// fields (`duration`, `thumbnail_key`, `hls_master_key`) become non-null
/// independently as pipeline stages complete.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Immutable identity
    pub id: VideoId,
    /// Display title
    pub title: String,
    /// Optional free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Genre tag
    pub genre: String,
    /// Storage key of the uploaded source object
    pub source_key: String,
    /// Duration in whole seconds, null until probed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Storage key of the poster thumbnail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    /// Storage key of the HLS master playlist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hls_master_key: Option<String>,
    /// Ingestion state
    #[serde(default)]
    pub status: VideoStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// True when every derived field is populated.
    pub fn is_complete(&self) -> bool {
        self.duration.is_some() && self.thumbnail_key.is_some() && self.hls_master_key.is_some()
    }

    /// Filename stem the derived artifacts are namespaced under.
    pub fn base(&self) -> String {
        crate::asset_key::base_from_key(&self.source_key)
    }
}

/// Request payload for creating a video record.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVideoRequest {
    /// Storage key of the already-uploaded source object
    #[validate(length(min = 1, message = "source key must not be empty"))]
    pub source_key: String,
    /// Display title
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Genre tag
    #[validate(length(min = 1, max = 255))]
    pub genre: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [VideoStatus::Pending, VideoStatus::Ready, VideoStatus::Failed] {
            assert_eq!(status.as_str().parse::<VideoStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn create_request_rejects_empty_title() {
        let req = CreateVideoRequest {
            source_key: "videos/clip_1700000000_ab12cd3.mp4".to_string(),
            title: String::new(),
            genre: "drama".to_string(),
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn record_completeness_requires_all_fields() {
        let now = Utc::now();
        let mut record = VideoRecord {
            id: VideoId(1),
            title: "Clip".to_string(),
            description: None,
            genre: "drama".to_string(),
            source_key: "videos/clip_1700000000_ab12cd3.mp4".to_string(),
            duration: Some(10),
            thumbnail_key: Some("thumbnails/clip.jpg".to_string()),
            hls_master_key: None,
            status: VideoStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        assert!(!record.is_complete());
        record.hls_master_key = Some("hls/clip/clip_master.m3u8".to_string());
        assert!(record.is_complete());
        assert_eq!(record.base(), "clip");
    }
}
