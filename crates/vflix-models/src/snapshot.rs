//! Snapshot capability for the analytics exporter.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoRecord;
use crate::watch::WatchHistory;

/// A row type the exporter can serialize.
///
/// Implementors produce one flat JSON record per row; the exporter writes
/// the collected records as a JSON array.
pub trait Snapshot {
    /// Lowercased entity name used in the export key.
    const NAME: &'static str;

    /// Serialize this row into one export record.
    fn snapshot(&self) -> serde_json::Value;
}

impl Snapshot for VideoRecord {
    const NAME: &'static str = "video";

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_i64(),
            "title": self.title,
            "description": self.description,
            "genre": self.genre,
            "source_key": self.source_key,
            "duration": self.duration,
            "thumbnail_key": self.thumbnail_key,
            "hls_master_key": self.hls_master_key,
            "status": self.status.as_str(),
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

impl Snapshot for WatchHistory {
    const NAME: &'static str = "userwatchhistory";

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "user_id": self.user_id.as_i64(),
            "video_id": self.video_id.as_i64(),
            "progress": self.progress,
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

/// The entities the exporter knows how to snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotEntity {
    Video,
    WatchHistory,
    User,
}

impl SnapshotEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotEntity::Video => "video",
            SnapshotEntity::WatchHistory => "userwatchhistory",
            SnapshotEntity::User => "user",
        }
    }
}

impl fmt::Display for SnapshotEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserId;
    use crate::video::VideoId;
    use chrono::Utc;

    #[test]
    fn watch_history_snapshot_is_flat() {
        let row = WatchHistory {
            id: 5,
            user_id: UserId(7),
            video_id: VideoId(1),
            progress: 42,
            updated_at: Utc::now(),
        };
        let record = row.snapshot();
        assert_eq!(record["user_id"], 7);
        assert_eq!(record["video_id"], 1);
        assert_eq!(record["progress"], 42);
    }

    #[test]
    fn entity_names_match_export_layout() {
        assert_eq!(SnapshotEntity::WatchHistory.as_str(), "userwatchhistory");
        assert_eq!(SnapshotEntity::Video.as_str(), "video");
    }
}
