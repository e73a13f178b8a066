//! Database integration tests.
//!
//! Run against a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use vflix_db::{DbError, VideoStore, WatchHistoryStore};
use vflix_models::{CreateVideoRequest, IdentityContext, UserId, VideoStatus};

async fn pool() -> sqlx::PgPool {
    dotenvy::dotenv().ok();
    vflix_db::connect_from_env()
        .await
        .expect("Failed to connect to database")
}

fn request(source_key: &str) -> CreateVideoRequest {
    CreateVideoRequest {
        source_key: source_key.to_string(),
        title: "Integration clip".to_string(),
        genre: "testing".to_string(),
        description: None,
    }
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str) -> UserId {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email) VALUES ($1) \
         ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("ensure user");
    UserId(id)
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn video_lifecycle_and_ready_predicate() {
    let pool = pool().await;
    let videos = VideoStore::new(pool.clone());

    let record = videos
        .create(&request("videos/clip_1700000001_aa11bb2.mp4"))
        .await
        .unwrap();
    assert_eq!(record.status, VideoStatus::Pending);
    assert!(record.duration.is_none());

    // Field-scoped stage writes in arbitrary order.
    videos.set_thumbnail_key(record.id, "thumbnails/clip.jpg").await.unwrap();
    assert!(!videos.mark_ready_if_complete(record.id).await.unwrap());

    videos.set_duration(record.id, 10).await.unwrap();
    assert!(!videos.mark_ready_if_complete(record.id).await.unwrap());

    videos
        .set_hls_master_key(record.id, "hls/clip/clip_master.m3u8")
        .await
        .unwrap();
    assert!(videos.mark_ready_if_complete(record.id).await.unwrap());
    // Second promotion is a no-op.
    assert!(!videos.mark_ready_if_complete(record.id).await.unwrap());

    let loaded = videos.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, VideoStatus::Ready);
    assert!(loaded.is_complete());

    let keys = videos.delete(record.id).await.unwrap().unwrap();
    assert_eq!(keys.hls_master_key.as_deref(), Some("hls/clip/clip_master.m3u8"));
    assert!(videos.get(record.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn upsert_is_the_only_write_path() {
    let pool = pool().await;
    let videos = VideoStore::new(pool.clone());
    let history = WatchHistoryStore::new(pool.clone());

    let video = videos
        .create(&request("videos/watch_1700000002_cc33dd4.mp4"))
        .await
        .unwrap();
    videos.set_duration(video.id, 100).await.unwrap();
    let user = ensure_user(&pool, "watcher@example.com").await;

    let (row, created) = history.upsert(user, video.id, 50).await.unwrap();
    assert!(created);
    assert_eq!(row.progress, 50);

    // Same pair again: update, not insert.
    let (row2, created2) = history.upsert(user, video.id, 80).await.unwrap();
    assert!(!created2);
    assert_eq!(row2.id, row.id);
    assert_eq!(row2.progress, 80);

    // Progress == duration is accepted; duration + 1 is a contract error.
    let (_, _) = history.upsert(user, video.id, 100).await.unwrap();
    let err = history.upsert(user, video.id, 101).await.unwrap_err();
    assert!(matches!(err, DbError::ProgressExceedsDuration { .. }));

    let rows = history.list_for_user(user, Some(video.id)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].progress, 100);

    videos.delete(video.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn concurrent_upserts_keep_one_row() {
    let pool = pool().await;
    let videos = VideoStore::new(pool.clone());
    let history = WatchHistoryStore::new(pool.clone());

    let video = videos
        .create(&request("videos/race_1700000003_ee55ff6.mp4"))
        .await
        .unwrap();
    videos.set_duration(video.id, 100).await.unwrap();
    let user = ensure_user(&pool, "racer@example.com").await;

    let a = history.upsert(user, video.id, 3);
    let b = history.upsert(user, video.id, 5);
    let (ra, rb) = tokio::join!(a, b);
    ra.unwrap();
    rb.unwrap();

    let rows = history.list_for_user(user, Some(video.id)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].progress == 3 || rows[0].progress == 5);

    videos.delete(video.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn only_admins_delete_history() {
    let pool = pool().await;
    let videos = VideoStore::new(pool.clone());
    let history = WatchHistoryStore::new(pool.clone());

    let video = videos
        .create(&request("videos/perm_1700000004_gg77hh8.mp4"))
        .await
        .unwrap();
    videos.set_duration(video.id, 100).await.unwrap();
    let user = ensure_user(&pool, "deletee@example.com").await;

    let (row, _) = history.upsert(user, video.id, 10).await.unwrap();

    let err = history
        .delete(row.id, &IdentityContext::user(user.as_i64()))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Forbidden(_)));

    history
        .delete(row.id, &IdentityContext::admin(1))
        .await
        .unwrap();

    let rows = history.list_for_user(user, Some(video.id)).await.unwrap();
    assert!(rows.is_empty());

    videos.delete(video.id).await.unwrap();
}
