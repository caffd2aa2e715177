//! Storage replacer

use mediaopt_core::{MediaObject, OptimizedArtifact, PipelineError, StorageOperation};
use mediaopt_storage::Storage;

/// Overwrite the original object with the optimized artifact.
///
/// Content type becomes the artifact's, metadata keeps every declared key and gains
/// the processed marker. Bytes, content type and metadata go out in one write.
#[tracing::instrument(skip(storage, media, artifact), fields(path = %media.path, content_type = %artifact.content_type))]
pub async fn replace_object(
    storage: &dyn Storage,
    media: &MediaObject,
    artifact: &OptimizedArtifact,
) -> Result<(), PipelineError> {
    let data = tokio::fs::read(&artifact.path).await.map_err(|e| {
        PipelineError::storage(
            &media.path,
            StorageOperation::Upload,
            format!("failed to read optimized artifact: {}", e),
        )
    })?;

    let size = data.len();
    storage
        .upload(
            &media.bucket,
            &media.path,
            data,
            &artifact.content_type,
            &media.processed_metadata(),
        )
        .await
        .map_err(|e| PipelineError::storage(&media.path, StorageOperation::Upload, e))?;

    tracing::info!(
        original_size_bytes = media.size,
        size_bytes = size,
        "Original replaced with optimized artifact"
    );
    Ok(())
}
