//! Analytics exporter.
//!
//! Serializes entity snapshots to storage as timestamped JSON record
//! arrays under `exports/`. The scheduled hourly run is authoritative and
//! unthrottled; change-driven triggers pass through the shared rate gate
//! so only the first caller in each hour bucket runs.

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use vflix_models::{asset_key, Snapshot, SnapshotEntity};
use vflix_queue::ExportSnapshotJob;
use vflix_storage::ObjectStore;

use crate::context::ProcessingContext;
use crate::error::WorkerResult;

/// Rate-gate bucket width for change-driven exports.
pub const EXPORT_GATE_WINDOW: Duration = Duration::from_secs(3600);

/// Handle an `ExportSnapshot` job.
///
/// Returns the export key, or `None` when a throttled invocation lost the
/// rate gate and was a no-op.
pub async fn run_export(
    ctx: &ProcessingContext,
    job: &ExportSnapshotJob,
) -> WorkerResult<Option<String>> {
    if job.throttled {
        let gate_key = format!("export:{}", job.entity);
        if !ctx.rate_gate.try_pass(&gate_key, EXPORT_GATE_WINDOW).await? {
            info!("Export of {} throttled by rate gate", job.entity);
            return Ok(None);
        }
    }

    let key = match job.entity {
        SnapshotEntity::Video => {
            let rows = ctx.videos.list_all().await?;
            export_rows(&ctx.storage, &rows).await?
        }
        SnapshotEntity::WatchHistory => {
            let rows = ctx.history.list_all().await?;
            export_rows(&ctx.storage, &rows).await?
        }
        SnapshotEntity::User => {
            let rows = ctx.users.list_all().await?;
            export_rows(&ctx.storage, &rows).await?
        }
    };

    Ok(Some(key))
}

/// Export the Video table directly (pipeline and deletion side effects).
pub async fn export_videos(ctx: &ProcessingContext) -> WorkerResult<String> {
    let rows = ctx.videos.list_all().await?;
    export_rows(&ctx.storage, &rows).await
}

/// Serialize rows to a JSON record array and upload it under `exports/`.
///
/// The snapshot covers the rows at the moment the query ran; concurrent
/// writes may or may not appear.
async fn export_rows<T: Snapshot>(storage: &ObjectStore, rows: &[T]) -> WorkerResult<String> {
    let records: Vec<serde_json::Value> = rows.iter().map(Snapshot::snapshot).collect();
    let body = serde_json::to_vec(&records).map_err(|e| {
        crate::error::WorkerError::job_failed(format!("snapshot serialization: {e}"))
    })?;

    let key = asset_key::export_key(T::NAME, Utc::now());
    storage.put_bytes(body, &key, "application/json").await?;

    info!("Exported {} {} records to {}", rows.len(), T::NAME, key);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use vflix_models::{Snapshot, UserId, VideoId, WatchHistory};

    #[test]
    fn snapshot_rows_serialize_to_a_record_array() {
        let rows = vec![
            WatchHistory {
                id: 1,
                user_id: UserId(7),
                video_id: VideoId(1),
                progress: 3,
                updated_at: chrono::Utc::now(),
            },
            WatchHistory {
                id: 2,
                user_id: UserId(8),
                video_id: VideoId(1),
                progress: 5,
                updated_at: chrono::Utc::now(),
            },
        ];

        let records: Vec<serde_json::Value> = rows.iter().map(Snapshot::snapshot).collect();
        let body = serde_json::to_string(&records).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert!(parsed.is_array());
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["user_id"], 7);
        assert_eq!(parsed[1]["progress"], 5);
    }
}
