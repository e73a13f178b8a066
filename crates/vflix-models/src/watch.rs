//! Watch-history models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::video::VideoId;

/// Per-user playback resume point for one video.
///
/// At most one row exists per `(user_id, video_id)`; the upsert is the only
/// write path. `progress` never exceeds the video's duration when the
/// duration is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WatchHistory {
    /// Row id
    pub id: i64,
    /// Owning user
    pub user_id: UserId,
    /// Watched video
    pub video_id: VideoId,
    /// Resume point in seconds
    pub progress: i64,
    /// Last write timestamp
    pub updated_at: DateTime<Utc>,
}
