//! Database error types.

use thiserror::Error;

use vflix_models::ErrorKind;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Progress {progress}s exceeds video duration {duration}s")]
    ProgressExceedsDuration { progress: i64, duration: i64 },

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Config(_) => ErrorKind::Internal,
            DbError::NotFound(_) => ErrorKind::NotFound,
            DbError::Forbidden(_) => ErrorKind::Forbidden,
            DbError::ProgressExceedsDuration { .. } => ErrorKind::Contract,
            DbError::Sqlx(e) => match e.as_database_error() {
                // Constraint violations are contract errors; everything else
                // (pool exhaustion, connection loss) is worth retrying.
                Some(dbe) if dbe.is_unique_violation() || dbe.is_check_violation() => {
                    ErrorKind::Contract
                }
                Some(dbe) if dbe.is_foreign_key_violation() => ErrorKind::Contract,
                _ => ErrorKind::Transient,
            },
            DbError::Migrate(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            DbError::ProgressExceedsDuration {
                progress: 11,
                duration: 10
            }
            .kind(),
            ErrorKind::Contract
        );
        assert_eq!(DbError::not_found("video 9").kind(), ErrorKind::NotFound);
        assert_eq!(
            DbError::forbidden("admin only").kind(),
            ErrorKind::Forbidden
        );
    }
}
