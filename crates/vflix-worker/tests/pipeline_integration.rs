//! End-to-end pipeline tests.
//!
//! These drive the stage handlers directly against live services
//! (Postgres, Redis, MinIO) plus a local ffmpeg. Generate nothing by hand:
//! the source clip is synthesized with ffmpeg's test source.
//!
//! `cargo test -p vflix-worker -- --ignored`

use std::process::Stdio;
use std::sync::Arc;

use tokio::sync::watch;

use vflix_models::{asset_key, CreateVideoRequest, VideoStatus, RENDITION_HEIGHTS};
use vflix_queue::{DeleteAssetsJob, JobQueue, ProcessVideoJob};
use vflix_storage::{ObjectStore, TempFile};
use vflix_worker::{hls, pipeline, thumbnail, ProcessingContext, WorkerConfig};

async fn context() -> (ProcessingContext, watch::Sender<bool>) {
    dotenvy::dotenv().ok();

    let pool = vflix_db::connect_from_env().await.expect("database");
    let storage = ObjectStore::from_env().expect("object store");
    let queue = Arc::new(JobQueue::from_env().expect("queue"));
    queue.init().await.expect("queue init");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctx = ProcessingContext::new(WorkerConfig::default(), pool, storage, queue, cancel_rx);
    (ctx, cancel_tx)
}

/// Synthesize a short test clip (10s, 1280x720) with ffmpeg.
async fn synthesize_clip() -> TempFile {
    let clip = TempFile::with_suffix(".mp4").unwrap();
    let status = tokio::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=10:size=1280x720:rate=24",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=10",
            "-c:v",
            "h264",
            "-c:a",
            "aac",
            "-shortest",
        ])
        .arg(clip.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .expect("ffmpeg available");
    assert!(status.success(), "test clip synthesis failed");
    clip
}

#[tokio::test]
#[ignore = "requires Postgres, Redis, object store and ffmpeg"]
async fn full_ingestion_produces_the_documented_layout() {
    let (ctx, _cancel) = context().await;

    // Upload a 10s 1280x720 source as "clip.mp4".
    let local_clip = synthesize_clip().await;
    let source_key = asset_key::source_key("clip.mp4", chrono::Utc::now());
    ctx.storage.put(local_clip.path(), &source_key).await.unwrap();

    let record = ctx
        .videos
        .create(&CreateVideoRequest {
            source_key: source_key.clone(),
            title: "Clip".to_string(),
            genre: "testing".to_string(),
            description: None,
        })
        .await
        .unwrap();

    // Drive the pipeline stages the way the executor would.
    let job = ProcessVideoJob::new(record.id, &source_key);
    pipeline::run_process_video(&ctx, &job).await.unwrap();

    let base = asset_key::base_from_key(&source_key);
    assert_eq!(base, "clip");

    thumbnail::run_thumbnail(&ctx, record.id, &source_key, &base)
        .await
        .unwrap();
    hls::run_transcode_hls(&ctx, record.id, &source_key, &base)
        .await
        .unwrap();

    // Record state matches the documented end state.
    let finished = ctx.videos.get(record.id).await.unwrap().unwrap();
    assert_eq!(finished.duration, Some(10));
    assert_eq!(finished.thumbnail_key.as_deref(), Some("thumbnails/clip.jpg"));
    assert_eq!(
        finished.hls_master_key.as_deref(),
        Some("hls/clip/clip_master.m3u8")
    );
    assert_eq!(finished.status, VideoStatus::Ready);

    // Storage layout: every variant playlist and its first segment exist.
    for height in RENDITION_HEIGHTS {
        let playlist =
            asset_key::hls_segment_key(&base, &asset_key::variant_playlist_name(&base, height));
        assert!(ctx.storage.exists(&playlist).await.unwrap(), "{playlist}");

        let first_segment =
            asset_key::hls_segment_key(&base, &asset_key::segment_name(&base, height, 0));
        assert!(ctx.storage.exists(&first_segment).await.unwrap(), "{first_segment}");
    }

    // Master references all four renditions through presigned URLs.
    let master = ctx
        .storage
        .get_bytes("hls/clip/clip_master.m3u8")
        .await
        .unwrap();
    let master = String::from_utf8(master).unwrap();
    assert!(master.starts_with("#EXTM3U\n"));
    for height in RENDITION_HEIGHTS {
        assert!(master.contains(&format!("RESOLUTION=1920x{height}")));
    }

    // Re-running a finished stage is a fast no-op.
    let again = hls::run_transcode_hls(&ctx, record.id, &source_key, &base)
        .await
        .unwrap();
    assert_eq!(again, "hls/clip/clip_master.m3u8");

    // Deletion sweeps every derived artifact and the source.
    let keys = ctx.videos.delete(record.id).await.unwrap().unwrap();
    let sweep = DeleteAssetsJob::new(
        keys.hls_master_key,
        keys.thumbnail_key,
        Some(keys.source_key),
    );
    vflix_worker::delete::run_delete_assets(&ctx, &sweep)
        .await
        .unwrap();

    assert!(ctx
        .storage
        .list_objects(&asset_key::hls_prefix(&base))
        .await
        .unwrap()
        .is_empty());
    assert!(!ctx.storage.exists("thumbnails/clip.jpg").await.unwrap());
    assert!(!ctx.storage.exists(&source_key).await.unwrap());
}

#[tokio::test]
#[ignore = "requires Postgres, Redis, object store"]
async fn zero_byte_source_fails_probe_and_marks_record() {
    let (ctx, _cancel) = context().await;

    let empty = TempFile::with_suffix(".mp4").unwrap();
    let source_key = asset_key::source_key("empty.mp4", chrono::Utc::now());
    ctx.storage.put(empty.path(), &source_key).await.unwrap();

    let record = ctx
        .videos
        .create(&CreateVideoRequest {
            source_key: source_key.clone(),
            title: "Empty".to_string(),
            genre: "testing".to_string(),
            description: None,
        })
        .await
        .unwrap();

    // The pipeline swallows the invalid-input probe, marks the record
    // failed, and still fans out.
    let job = ProcessVideoJob::new(record.id, &source_key);
    pipeline::run_process_video(&ctx, &job).await.unwrap();

    let after = ctx.videos.get(record.id).await.unwrap().unwrap();
    assert_eq!(after.duration, None);
    assert_eq!(after.status, VideoStatus::Failed);

    // Cleanup.
    ctx.videos.delete(record.id).await.unwrap();
    ctx.storage.delete_object(&source_key).await.unwrap();
}

#[tokio::test]
#[ignore = "requires Postgres, Redis, object store"]
async fn throttled_export_runs_once_per_bucket() {
    let (ctx, _cancel) = context().await;

    let job = vflix_queue::ExportSnapshotJob::new(vflix_models::SnapshotEntity::WatchHistory)
        .throttled();

    let first = vflix_worker::export::run_export(&ctx, &job).await.unwrap();
    let second = vflix_worker::export::run_export(&ctx, &job).await.unwrap();

    // Exactly one of the two produced an object; within one bucket the
    // second call is a no-op. (First may be None if an earlier test run
    // already consumed this bucket.)
    if first.is_some() {
        assert!(second.is_none());
    }

    // The unthrottled (scheduled) run always exports.
    let scheduled =
        vflix_queue::ExportSnapshotJob::new(vflix_models::SnapshotEntity::WatchHistory);
    let exported = vflix_worker::export::run_export(&ctx, &scheduled)
        .await
        .unwrap()
        .expect("scheduled export runs unconditionally");
    assert!(exported.starts_with("exports/userwatchhistory_"));
    assert!(exported.ends_with(".json"));

    ctx.storage.delete_object(&exported).await.unwrap();
}
