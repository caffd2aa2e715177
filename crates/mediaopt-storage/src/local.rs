use crate::traits::{validate_bucket, validate_path, ObjectInfo, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory under the base path holding per-object metadata sidecars.
const METADATA_DIR: &str = ".metadata";

/// Content type and metadata of a locally stored object.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    content_type: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Local filesystem storage implementation
///
/// Object bytes live at `{base_path}/{bucket}/{path}`; content type and metadata live
/// in a JSON sidecar at `{base_path}/.metadata/{bucket}/{path}.json`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory; each bucket is a sub-directory
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert bucket and path to the data file location with security validation
    fn object_path(&self, bucket: &str, path: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        validate_path(path)?;
        if bucket == METADATA_DIR {
            return Err(StorageError::InvalidKey(format!(
                "Bucket name '{}' is reserved",
                bucket
            )));
        }
        Ok(self.base_path.join(bucket).join(path))
    }

    fn sidecar_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.base_path
            .join(METADATA_DIR)
            .join(bucket)
            .join(format!("{}.json", path))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write to a sibling temp file and rename it over the target.
    async fn write_atomically(&self, target: &Path, data: &[u8]) -> StorageResult<()> {
        self.ensure_parent_dir(target).await?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = target.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let mut file = fs::File::create(&temp).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", temp.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", temp.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", temp.display(), e))
        })?;

        if let Err(e) = fs::rename(&temp, target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                target.display(),
                e
            )));
        }

        Ok(())
    }

    async fn read_sidecar(&self, bucket: &str, path: &str) -> StorageResult<Sidecar> {
        match fs::read(self.sidecar_path(bucket, path)).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| StorageError::BackendError(format!("Corrupt metadata sidecar: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn download(&self, bucket: &str, path: &str) -> StorageResult<Vec<u8>> {
        let file = self.object_path(bucket, path)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&file).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    file.display(),
                    e
                )));
            }
        };

        tracing::info!(
            bucket = %bucket,
            path = %path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> StorageResult<()> {
        let file = self.object_path(bucket, path)?;
        let size = data.len();
        let start = std::time::Instant::now();

        let sidecar = Sidecar {
            content_type: Some(content_type.to_string()),
            metadata: metadata.clone(),
        };
        let sidecar_bytes = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode metadata: {}", e)))?;

        // Data first: a failed data write must not leave the new metadata behind.
        self.write_atomically(&file, &data).await?;
        self.write_atomically(&self.sidecar_path(bucket, path), &sidecar_bytes)
            .await?;

        tracing::info!(
            bucket = %bucket,
            path = %path,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete(&self, bucket: &str, path: &str) -> StorageResult<()> {
        let file = self.object_path(bucket, path)?;
        let start = std::time::Instant::now();

        let removed = remove_if_exists(&file).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", file.display(), e))
        })?;
        remove_if_exists(&self.sidecar_path(bucket, path))
            .await
            .map_err(|e| StorageError::DeleteFailed(format!("Failed to delete metadata: {}", e)))?;

        tracing::info!(
            bucket = %bucket,
            path = %path,
            existed = removed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn head(&self, bucket: &str, path: &str) -> StorageResult<ObjectInfo> {
        let file = self.object_path(bucket, path)?;

        let meta = match fs::metadata(&file).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        };
        let sidecar = self.read_sidecar(bucket, path).await?;

        Ok(ObjectInfo {
            size: meta.len(),
            content_type: sidecar.content_type,
            metadata: sidecar.metadata,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload(
                "bucket",
                "uploads/a.jpg",
                b"test data".to_vec(),
                "image/jpeg",
                &metadata(&[("owner", "user-1")]),
            )
            .await
            .unwrap();

        let downloaded = storage.download("bucket", "uploads/a.jpg").await.unwrap();
        assert_eq!(downloaded, b"test data");
        assert!(dir.path().join("bucket/uploads/a.jpg").exists());
    }

    #[tokio::test]
    async fn test_local_storage_head_returns_metadata() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload(
                "bucket",
                "uploads/a.jpg",
                vec![1, 2, 3],
                "image/jpeg",
                &metadata(&[("optimized", "true")]),
            )
            .await
            .unwrap();

        let info = storage.head("bucket", "uploads/a.jpg").await.unwrap();
        assert_eq!(info.size, 3);
        assert_eq!(info.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(info.metadata, metadata(&[("optimized", "true")]));
    }

    #[tokio::test]
    async fn test_local_storage_overwrite_replaces_metadata() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload(
                "bucket",
                "uploads/a.png",
                vec![0; 10],
                "image/png",
                &metadata(&[("owner", "user-1")]),
            )
            .await
            .unwrap();
        storage
            .upload(
                "bucket",
                "uploads/a.png",
                vec![0; 4],
                "image/jpeg",
                &metadata(&[("owner", "user-1"), ("optimized", "true")]),
            )
            .await
            .unwrap();

        let info = storage.head("bucket", "uploads/a.png").await.unwrap();
        assert_eq!(info.size, 4);
        assert_eq!(info.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(info.metadata.len(), 2);
    }

    #[tokio::test]
    async fn test_local_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload("bucket", "uploads/x.mp4", vec![9], "video/mp4", &HashMap::new())
            .await
            .unwrap();
        storage.delete("bucket", "uploads/x.mp4").await.unwrap();

        assert!(matches!(
            storage.download("bucket", "uploads/x.mp4").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.head("bucket", "uploads/x.mp4").await,
            Err(StorageError::NotFound(_))
        ));
        // Deleting a missing object is not an error
        storage.delete("bucket", "uploads/x.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage
            .upload("bucket", "../escape.txt", vec![1], "text/plain", &HashMap::new())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.download(".metadata", "uploads/a.jpg.json").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_no_temp_files_left() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload("bucket", "uploads/a.jpg", vec![1], "image/jpeg", &HashMap::new())
            .await
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("bucket/uploads"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("a.jpg")]);
    }

    #[tokio::test]
    async fn test_failed_data_write_keeps_previous_metadata() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload(
                "bucket",
                "uploads/a.jpg",
                vec![1, 2, 3],
                "image/png",
                &metadata(&[("owner", "user-1")]),
            )
            .await
            .unwrap();

        // A non-empty directory at the data location makes the rename fail
        let data_path = dir.path().join("bucket/uploads/a.jpg");
        std::fs::remove_file(&data_path).unwrap();
        std::fs::create_dir_all(data_path.join("blocker")).unwrap();

        let result = storage
            .upload(
                "bucket",
                "uploads/a.jpg",
                vec![9],
                "image/jpeg",
                &metadata(&[("owner", "user-1"), ("optimized", "true")]),
            )
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));

        let sidecar = storage.read_sidecar("bucket", "uploads/a.jpg").await.unwrap();
        assert_eq!(sidecar.content_type.as_deref(), Some("image/png"));
        assert!(!sidecar.metadata.contains_key("optimized"));
    }

    #[tokio::test]
    async fn test_dotted_file_name_round_trips() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .upload(
                "bucket",
                "uploads/holiday..final.jpg",
                vec![7],
                "image/jpeg",
                &HashMap::new(),
            )
            .await
            .unwrap();

        let data = storage
            .download("bucket", "uploads/holiday..final.jpg")
            .await
            .unwrap();
        assert_eq!(data, vec![7]);
    }
}
