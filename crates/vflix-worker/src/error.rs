//! Worker error types.

use thiserror::Error;

use vflix_models::ErrorKind;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Stage timed out after {0} seconds")]
    StageTimeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] vflix_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vflix_storage::StorageError),

    #[error("Database error: {0}")]
    Db(#[from] vflix_db::DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] vflix_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::JobFailed(_) => ErrorKind::Internal,
            WorkerError::StageTimeout(_) => ErrorKind::Transient,
            WorkerError::ConfigError(_) => ErrorKind::Internal,
            WorkerError::Media(e) => e.kind(),
            WorkerError::Storage(e) => {
                if e.is_transient() {
                    ErrorKind::Transient
                } else if matches!(e, vflix_storage::StorageError::NotFound(_)) {
                    // A missing source object cannot be fixed by retrying.
                    ErrorKind::InputInvalid
                } else {
                    ErrorKind::Internal
                }
            }
            WorkerError::Db(e) => e.kind(),
            WorkerError::Queue(e) => e.kind(),
            WorkerError::Io(_) => ErrorKind::Transient,
        }
    }

    /// True when the retry budget for this error's kind is non-zero.
    pub fn is_retryable(&self) -> bool {
        self.kind().retry_budget() > 0
    }
}
