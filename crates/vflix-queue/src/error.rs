//! Queue error types.

use thiserror::Error;

use vflix_models::ErrorKind;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("Handler already registered: {0}")]
    SchedulerBusy(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    pub fn scheduler_busy(name: impl Into<String>) -> Self {
        Self::SchedulerBusy(name.into())
    }

    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::SchedulerBusy(_) => ErrorKind::Contract,
            QueueError::Json(_) => ErrorKind::Internal,
            _ => ErrorKind::Transient,
        }
    }
}
