//! In-memory object store
//!
//! Keeps objects in a map and counts every call so tests can assert that an
//! invocation performed no store writes. Individual operations can be made to fail.

use crate::traits::{validate_path, ObjectInfo, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use mediaopt_core::StorageOperation;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Default)]
struct State {
    objects: HashMap<(String, String), StoredObject>,
    failing: HashSet<Op>,
    downloads: usize,
    uploads: usize,
    deletes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Download,
    Upload,
    Delete,
}

impl From<StorageOperation> for Op {
    fn from(op: StorageOperation) -> Self {
        match op {
            StorageOperation::Download => Op::Download,
            StorageOperation::Upload => Op::Upload,
            StorageOperation::Delete => Op::Delete,
        }
    }
}

/// Mock storage implementation that stores objects in memory
#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object without counting it as an upload.
    pub fn insert(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) {
        self.lock().objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata,
            },
        );
    }

    /// Make every subsequent call of `operation` fail.
    pub fn fail_on(&self, operation: StorageOperation) {
        self.lock().failing.insert(operation.into());
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.object(bucket, path).is_some()
    }

    pub fn download_count(&self) -> usize {
        self.lock().downloads
    }

    pub fn upload_count(&self) -> usize {
        self.lock().uploads
    }

    pub fn delete_count(&self) -> usize {
        self.lock().deletes
    }

    /// Uploads plus deletes.
    pub fn write_count(&self) -> usize {
        let state = self.lock();
        state.uploads + state.deletes
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn download(&self, bucket: &str, path: &str) -> StorageResult<Vec<u8>> {
        validate_path(path)?;
        let mut state = self.lock();
        state.downloads += 1;
        if state.failing.contains(&Op::Download) {
            return Err(StorageError::DownloadFailed(format!(
                "injected download failure for {}",
                path
            )));
        }
        state
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()> {
        validate_path(path)?;
        let mut state = self.lock();
        state.uploads += 1;
        if state.failing.contains(&Op::Upload) {
            return Err(StorageError::UploadFailed(format!(
                "injected upload failure for {}",
                path
            )));
        }
        state.objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, path: &str) -> StorageResult<()> {
        validate_path(path)?;
        let mut state = self.lock();
        state.deletes += 1;
        if state.failing.contains(&Op::Delete) {
            return Err(StorageError::DeleteFailed(format!(
                "injected delete failure for {}",
                path
            )));
        }
        state
            .objects
            .remove(&(bucket.to_string(), path.to_string()));
        Ok(())
    }

    async fn head(&self, bucket: &str, path: &str) -> StorageResult<ObjectInfo> {
        validate_path(path)?;
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| ObjectInfo {
                size: o.data.len() as u64,
                content_type: Some(o.content_type.clone()),
                metadata: o.metadata.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
