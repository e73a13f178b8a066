//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use vflix_models::ErrorKind;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Classify into the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::FfmpegNotFound | MediaError::FfprobeNotFound => ErrorKind::Internal,
            MediaError::FfmpegFailed { .. } | MediaError::Timeout(_) | MediaError::Io(_) => {
                ErrorKind::Transient
            }
            MediaError::FfprobeFailed { .. }
            | MediaError::FileNotFound(_)
            | MediaError::InvalidVideo(_) => ErrorKind::InputInvalid,
            MediaError::Cancelled => ErrorKind::Cancelled,
            MediaError::JsonParse(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            MediaError::InvalidVideo("zero duration".into()).kind(),
            ErrorKind::InputInvalid
        );
        assert_eq!(MediaError::Timeout(900).kind(), ErrorKind::Transient);
        assert_eq!(MediaError::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
