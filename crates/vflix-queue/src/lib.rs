//! Redis Streams job queue.
//!
//! This crate provides:
//! - Job payload types for the ingestion pipeline
//! - Enqueue with idempotency-key deduplication
//! - Consumer-group consumption with retry counters and a DLQ
//! - Delayed delivery (used for retry backoff)
//! - A periodic scheduler with idempotent named registration
//! - A time-bucketed rate gate

pub mod error;
pub mod job;
pub mod queue;
pub mod rate_gate;
pub mod scheduler;

pub use error::{QueueError, QueueResult};
pub use job::{
    DeleteAssetsJob, ExportSnapshotJob, ProbeJob, ProcessVideoJob, QueueJob, ThumbnailJob,
    TranscodeHlsJob,
};
pub use queue::{JobQueue, QueueConfig};
pub use rate_gate::RateGate;
pub use scheduler::PeriodicScheduler;
