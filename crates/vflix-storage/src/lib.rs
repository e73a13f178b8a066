//! S3-compatible object storage gateway.
//!
//! This crate provides:
//! - File upload/download with content-type inference
//! - Presigned URL generation (inline disposition, extension-matched type)
//! - Single-object and prefix deletion
//! - Scoped temp-file lifecycle

pub mod client;
pub mod content_type;
pub mod error;
pub mod temp;

pub use client::{ObjectInfo, ObjectStore, StorageConfig};
pub use content_type::content_type_for_key;
pub use error::{StorageError, StorageResult};
pub use temp::{cleanup_files, TempFile};
