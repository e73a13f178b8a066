//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vflix_models::{JobId, SnapshotEntity, VideoId};

/// Orchestration job: probe the source and fan out the derived-asset jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVideoJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video record being ingested
    pub video_id: VideoId,
    /// Storage key of the uploaded source
    pub source_key: String,
    /// Retry attempt counter
    #[serde(default)]
    pub attempt: u32,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl ProcessVideoJob {
    pub fn new(video_id: VideoId, source_key: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            source_key: source_key.into(),
            attempt: 0,
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("process:{}", self.video_id)
    }
}

/// Stage job: probe the source duration and write it to the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video record
    pub video_id: VideoId,
    /// Storage key of the uploaded source
    pub source_key: String,
    /// Retry attempt counter
    #[serde(default)]
    pub attempt: u32,
}

impl ProbeJob {
    pub fn new(video_id: VideoId, source_key: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            source_key: source_key.into(),
            attempt: 0,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("probe:{}", self.video_id)
    }
}

/// Stage job: extract the poster thumbnail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video record
    pub video_id: VideoId,
    /// Storage key of the uploaded source
    pub source_key: String,
    /// Namespace base for the derived key
    pub base: String,
    /// Retry attempt counter
    #[serde(default)]
    pub attempt: u32,
}

impl ThumbnailJob {
    pub fn new(video_id: VideoId, source_key: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            source_key: source_key.into(),
            base: base.into(),
            attempt: 0,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("thumbnail:{}", self.video_id)
    }
}

/// Stage job: produce the full HLS rendition set and master playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeHlsJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video record
    pub video_id: VideoId,
    /// Storage key of the uploaded source
    pub source_key: String,
    /// Namespace base for derived keys
    pub base: String,
    /// Retry attempt counter
    #[serde(default)]
    pub attempt: u32,
}

impl TranscodeHlsJob {
    pub fn new(video_id: VideoId, source_key: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            source_key: source_key.into(),
            base: base.into(),
            attempt: 0,
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("hls:{}", self.video_id)
    }
}

/// Sweep job: remove every stored asset of a deleted video.
///
/// Carries the keys by value - the record is already gone when this runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAssetsJob {
    /// Unique job ID
    pub job_id: JobId,
    /// HLS master playlist key, if renditioning completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hls_master_key: Option<String>,
    /// Thumbnail key, if extraction completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    /// Source upload key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    /// Retry attempt counter
    #[serde(default)]
    pub attempt: u32,
}

impl DeleteAssetsJob {
    pub fn new(
        hls_master_key: Option<String>,
        thumbnail_key: Option<String>,
        source_key: Option<String>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            hls_master_key,
            thumbnail_key,
            source_key,
            attempt: 0,
        }
    }

    pub fn idempotency_key(&self) -> String {
        let anchor = self
            .source_key
            .as_deref()
            .or(self.hls_master_key.as_deref())
            .or(self.thumbnail_key.as_deref())
            .unwrap_or("empty");
        format!("delete:{anchor}")
    }
}

/// Export job: snapshot one entity's rows to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSnapshotJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Entity to snapshot
    pub entity: SnapshotEntity,
    /// True for change-driven triggers; the handler consults the rate gate.
    /// The scheduled hourly run sets this false and is authoritative.
    #[serde(default)]
    pub throttled: bool,
    /// Retry attempt counter
    #[serde(default)]
    pub attempt: u32,
}

impl ExportSnapshotJob {
    pub fn new(entity: SnapshotEntity) -> Self {
        Self {
            job_id: JobId::new(),
            entity,
            throttled: false,
            attempt: 0,
        }
    }

    /// Mark as change-driven (subject to the rate gate).
    pub fn throttled(mut self) -> Self {
        self.throttled = true;
        self
    }

    pub fn idempotency_key(&self) -> String {
        format!("export:{}", self.entity)
    }
}

/// Generic job wrapper for queue storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    /// Orchestration: probe + fan out thumbnail and HLS jobs
    ProcessVideo(ProcessVideoJob),
    /// Stage: set the probed duration
    Probe(ProbeJob),
    /// Stage: extract the poster thumbnail
    Thumbnail(ThumbnailJob),
    /// Stage: produce renditions and the master playlist
    TranscodeHls(TranscodeHlsJob),
    /// Sweep stored assets of a deleted video
    DeleteAssets(DeleteAssetsJob),
    /// Snapshot an entity to storage
    ExportSnapshot(ExportSnapshotJob),
}

impl QueueJob {
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::ProcessVideo(j) => &j.job_id,
            QueueJob::Probe(j) => &j.job_id,
            QueueJob::Thumbnail(j) => &j.job_id,
            QueueJob::TranscodeHls(j) => &j.job_id,
            QueueJob::DeleteAssets(j) => &j.job_id,
            QueueJob::ExportSnapshot(j) => &j.job_id,
        }
    }

    /// Correlated video id, where applicable.
    pub fn video_id(&self) -> Option<VideoId> {
        match self {
            QueueJob::ProcessVideo(j) => Some(j.video_id),
            QueueJob::Probe(j) => Some(j.video_id),
            QueueJob::Thumbnail(j) => Some(j.video_id),
            QueueJob::TranscodeHls(j) => Some(j.video_id),
            QueueJob::DeleteAssets(_) | QueueJob::ExportSnapshot(_) => None,
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::ProcessVideo(j) => j.idempotency_key(),
            QueueJob::Probe(j) => j.idempotency_key(),
            QueueJob::Thumbnail(j) => j.idempotency_key(),
            QueueJob::TranscodeHls(j) => j.idempotency_key(),
            QueueJob::DeleteAssets(j) => j.idempotency_key(),
            QueueJob::ExportSnapshot(j) => j.idempotency_key(),
        }
    }

    /// Retry attempt counter.
    pub fn attempt(&self) -> u32 {
        match self {
            QueueJob::ProcessVideo(j) => j.attempt,
            QueueJob::Probe(j) => j.attempt,
            QueueJob::Thumbnail(j) => j.attempt,
            QueueJob::TranscodeHls(j) => j.attempt,
            QueueJob::DeleteAssets(j) => j.attempt,
            QueueJob::ExportSnapshot(j) => j.attempt,
        }
    }

    /// A copy with the attempt counter bumped, for retry re-enqueue.
    pub fn with_next_attempt(&self) -> Self {
        let mut job = self.clone();
        match &mut job {
            QueueJob::ProcessVideo(j) => j.attempt += 1,
            QueueJob::Probe(j) => j.attempt += 1,
            QueueJob::Thumbnail(j) => j.attempt += 1,
            QueueJob::TranscodeHls(j) => j.attempt += 1,
            QueueJob::DeleteAssets(j) => j.attempt += 1,
            QueueJob::ExportSnapshot(j) => j.attempt += 1,
        }
        job
    }

    /// Short stage name for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            QueueJob::ProcessVideo(_) => "process_video",
            QueueJob::Probe(_) => "probe",
            QueueJob::Thumbnail(_) => "thumbnail",
            QueueJob::TranscodeHls(_) => "transcode_hls",
            QueueJob::DeleteAssets(_) => "delete_assets",
            QueueJob::ExportSnapshot(_) => "export_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_video_serde_roundtrip() {
        let job = ProcessVideoJob::new(VideoId(1), "videos/clip_1700000000_ab12cd3.mp4");
        let wrapper = QueueJob::ProcessVideo(job.clone());

        let json = serde_json::to_string(&wrapper).expect("serialize QueueJob");
        assert!(json.contains("\"type\":\"process_video\""));

        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize QueueJob");
        match decoded {
            QueueJob::ProcessVideo(j) => {
                assert_eq!(j.job_id, job.job_id);
                assert_eq!(j.video_id, job.video_id);
                assert_eq!(j.source_key, job.source_key);
                assert_eq!(j.attempt, 0);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn idempotency_keys_are_per_stage() {
        let video = VideoId(42);
        let source = "videos/clip_1700000000_ab12cd3.mp4";

        let process = QueueJob::ProcessVideo(ProcessVideoJob::new(video, source));
        let thumb = QueueJob::Thumbnail(ThumbnailJob::new(video, source, "clip"));
        let hls = QueueJob::TranscodeHls(TranscodeHlsJob::new(video, source, "clip"));

        assert_eq!(process.idempotency_key(), "process:42");
        assert_eq!(thumb.idempotency_key(), "thumbnail:42");
        assert_eq!(hls.idempotency_key(), "hls:42");
    }

    #[test]
    fn attempt_bumping_preserves_identity() {
        let job = QueueJob::Thumbnail(ThumbnailJob::new(VideoId(1), "videos/c.mp4", "c"));
        let retry = job.with_next_attempt();

        assert_eq!(retry.attempt(), 1);
        assert_eq!(retry.job_id(), job.job_id());
        assert_eq!(retry.idempotency_key(), job.idempotency_key());
    }

    #[test]
    fn delete_assets_key_prefers_source() {
        let job = DeleteAssetsJob::new(
            Some("hls/clip/clip_master.m3u8".into()),
            Some("thumbnails/clip.jpg".into()),
            Some("videos/clip_1700000000_ab12cd3.mp4".into()),
        );
        assert_eq!(
            job.idempotency_key(),
            "delete:videos/clip_1700000000_ab12cd3.mp4"
        );
    }

    #[test]
    fn export_throttle_flag() {
        let job = ExportSnapshotJob::new(SnapshotEntity::WatchHistory).throttled();
        assert!(job.throttled);
        assert_eq!(job.idempotency_key(), "export:userwatchhistory");
    }
}
