//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object store backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object path: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Attributes of a stored object, as returned by [`Storage::head`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Storage abstraction trait
///
/// All object store backends (S3, local filesystem, memory) implement this trait so
/// the pipeline never couples to a specific client. An `upload` replaces the object's
/// bytes, content type and metadata in one write; readers observe either the old or
/// the new object, never a mix.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the whole object into memory.
    async fn download(&self, bucket: &str, path: &str) -> StorageResult<Vec<u8>>;

    /// Create or overwrite the object at `path` with the given content type and
    /// metadata. Metadata not listed in `metadata` is dropped.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()>;

    /// Delete the object. Deleting an object that does not exist is not an error.
    async fn delete(&self, bucket: &str, path: &str) -> StorageResult<()>;

    /// Read size, content type and metadata without the body.
    async fn head(&self, bucket: &str, path: &str) -> StorageResult<ObjectInfo>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Reject paths that could escape a bucket when mapped onto a filesystem: empty or
/// absolute paths, and `.` or `..` segments. Dots inside a segment are legal.
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|segment| segment == ".." || segment == ".")
    {
        return Err(StorageError::InvalidKey(format!(
            "Object path contains invalid characters: '{}'",
            path
        )));
    }
    Ok(())
}

pub(crate) fn validate_bucket(bucket: &str) -> StorageResult<()> {
    if bucket.is_empty() || bucket.contains('/') || bucket.contains("..") {
        return Err(StorageError::InvalidKey(format!(
            "Invalid bucket name: '{}'",
            bucket
        )));
    }
    Ok(())
}
