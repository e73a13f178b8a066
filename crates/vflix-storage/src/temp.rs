//! Scoped temp-file lifecycle.
//!
//! Stage handlers stage sources and artifacts through local temp paths.
//! `TempFile` owns its path and removes the file on drop, so every exit
//! path (success, error, panic unwind) releases the file. `cleanup_files`
//! is the bulk helper for paths handed out as plain `PathBuf`s.

use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tracing::debug;

use crate::error::StorageResult;

/// A temp file bound to its guard's lifetime.
pub struct TempFile {
    path: TempPath,
}

impl TempFile {
    /// Create a temp file with the given suffix (e.g. ".mp4").
    pub fn with_suffix(suffix: &str) -> StorageResult<Self> {
        let file = Builder::new().prefix("vflix_").suffix(suffix).tempfile()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// The local path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for TempFile {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Remove files that still exist; missing paths are skipped.
pub async fn cleanup_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed temp file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_removed_on_drop() {
        let path = {
            let tmp = TempFile::with_suffix(".mp4").unwrap();
            assert!(tmp.path().exists());
            assert!(tmp.path().to_string_lossy().ends_with(".mp4"));
            tmp.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_paths() {
        let existing = {
            let tmp = TempFile::with_suffix(".jpg").unwrap();
            let p = tmp.path().to_path_buf();
            std::mem::forget(tmp);
            p
        };
        let missing = PathBuf::from("/tmp/vflix_does_not_exist.jpg");

        cleanup_files(&[existing.clone(), missing]).await;
        assert!(!existing.exists());
    }
}
