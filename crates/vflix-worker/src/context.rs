//! Shared processing context.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::watch;

use vflix_db::{UserStore, VideoStore, WatchHistoryStore};
use vflix_queue::{JobQueue, RateGate};
use vflix_storage::ObjectStore;

use crate::config::WorkerConfig;

/// Everything a stage handler needs, shared across the worker pool.
///
/// All handles are cheap clones over pooled connections; handlers never
/// share mutable state with each other.
#[derive(Clone)]
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub videos: VideoStore,
    pub history: WatchHistoryStore,
    pub users: UserStore,
    pub storage: ObjectStore,
    pub queue: Arc<JobQueue>,
    pub rate_gate: RateGate,
    /// Flips to true on shutdown; plumbed into encoder runs.
    pub cancel_rx: watch::Receiver<bool>,
}

impl ProcessingContext {
    pub fn new(
        config: WorkerConfig,
        pool: PgPool,
        storage: ObjectStore,
        queue: Arc<JobQueue>,
        cancel_rx: watch::Receiver<bool>,
    ) -> Self {
        let rate_gate = RateGate::new(queue.redis_client());
        Self {
            config,
            videos: VideoStore::new(pool.clone()),
            history: WatchHistoryStore::new(pool.clone()),
            users: UserStore::new(pool),
            storage,
            queue,
            rate_gate,
            cancel_rx,
        }
    }
}
