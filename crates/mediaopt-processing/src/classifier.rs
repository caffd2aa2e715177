//! Media classifier

use mediaopt_core::{MediaKind, MediaObject, PipelineError};

/// Map a validated object to its processing branch.
///
/// The validator has already rejected every other content type, so the error arm
/// only fires when the classifier is used on its own.
pub fn classify(media: &MediaObject) -> Result<MediaKind, PipelineError> {
    MediaKind::from_content_type(&media.content_type).ok_or_else(|| {
        PipelineError::UnsupportedContentType {
            path: media.path.clone(),
            content_type: media.content_type.clone(),
        }
    })
}
