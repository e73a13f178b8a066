//! Object-store integration tests.
//!
//! Point `STORAGE_*` at a scratch MinIO bucket, then
//! `cargo test -- --ignored`.

use std::time::Duration;

use vflix_storage::{ObjectStore, TempFile};

async fn store() -> ObjectStore {
    dotenvy::dotenv().ok();
    let store = ObjectStore::from_env().expect("Failed to configure object store");
    store
        .check_connectivity()
        .await
        .expect("Object store unreachable");
    store
}

#[tokio::test]
#[ignore = "requires object store"]
async fn put_get_roundtrip() {
    let store = store().await;

    let local = TempFile::with_suffix(".mp4").unwrap();
    tokio::fs::write(local.path(), b"not really a video").await.unwrap();

    let key = format!("videos/it_{}_ab12cd3.mp4", std::process::id());
    store.put(local.path(), &key).await.unwrap();
    assert!(store.exists(&key).await.unwrap());

    let copy = TempFile::with_suffix(".mp4").unwrap();
    store.get(&key, copy.path()).await.unwrap();
    let bytes = tokio::fs::read(copy.path()).await.unwrap();
    assert_eq!(bytes, b"not really a video");

    store.delete_object(&key).await.unwrap();
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
#[ignore = "requires object store"]
async fn presigned_playlist_declares_hls_content_type() {
    let store = store().await;

    let key = format!("hls/it{}/it_master.m3u8", std::process::id());
    store
        .put_bytes(b"#EXTM3U\n".to_vec(), &key, "application/vnd.apple.mpegurl")
        .await
        .unwrap();

    let url = store.presign(&key, Duration::from_secs(60)).await.unwrap();
    assert!(url.contains("response-content-disposition=inline"));
    assert!(url.to_lowercase().contains("mpegurl"));

    store.delete_object(&key).await.unwrap();
}

#[tokio::test]
#[ignore = "requires object store"]
async fn prefix_sweep_removes_everything() {
    let store = store().await;

    let prefix = format!("hls/sweep{}/", std::process::id());
    for name in ["a_120p.m3u8", "a_120p_000.ts", "a_master.m3u8"] {
        store
            .put_bytes(b"x".to_vec(), &format!("{prefix}{name}"), "video/mp2t")
            .await
            .unwrap();
    }

    let removed = store.delete_prefix(&prefix).await.unwrap();
    assert_eq!(removed, 3);
    assert!(store.list_objects(&prefix).await.unwrap().is_empty());

    // Sweeping an empty prefix succeeds with no effect.
    assert_eq!(store.delete_prefix(&prefix).await.unwrap(), 0);
}
