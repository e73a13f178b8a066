//! Service error types.

use thiserror::Error;

use vflix_models::ErrorKind;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Db(#[from] vflix_db::DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] vflix_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] vflix_storage::StorageError),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Contract,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Db(e) => e.kind(),
            ApiError::Queue(e) => e.kind(),
            ApiError::Storage(e) => {
                if e.is_transient() {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Internal
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            ApiError::Validation("title".into()).kind(),
            ErrorKind::Contract
        );
        assert_eq!(ApiError::not_found("video 9").kind(), ErrorKind::NotFound);
        assert_eq!(
            ApiError::Db(vflix_db::DbError::forbidden("admin only")).kind(),
            ErrorKind::Forbidden
        );
    }
}
