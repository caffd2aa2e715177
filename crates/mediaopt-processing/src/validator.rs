use mediaopt_core::constants::EXPECTED_CONTENT_TYPES;
use mediaopt_core::{MediaKind, MediaObject, PipelineError};

/// Structural checks run before any download or encoding.
///
/// Checks run in order and stop at the first failure: zero size, extension versus
/// declared content type, then media kind.
pub struct MediaValidator {
    expected_content_types: &'static [(&'static str, &'static str)],
}

impl Default for MediaValidator {
    fn default() -> Self {
        Self::new(EXPECTED_CONTENT_TYPES)
    }
}

impl MediaValidator {
    /// `expected_content_types` maps a lowercase extension with its dot to the only
    /// content type it may be declared as.
    pub fn new(expected_content_types: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            expected_content_types,
        }
    }

    #[tracing::instrument(skip(self, media), fields(path = %media.path, content_type = %media.content_type, size_bytes = media.size))]
    pub fn validate(&self, media: &MediaObject) -> Result<(), PipelineError> {
        self.validate_size(media)?;
        self.validate_consistency(media)?;
        self.validate_media_kind(media)?;
        tracing::debug!("Validation passed");
        Ok(())
    }

    /// Validate declared size
    pub fn validate_size(&self, media: &MediaObject) -> Result<(), PipelineError> {
        if media.size == 0 {
            return Err(PipelineError::CorruptInput {
                path: media.path.clone(),
            });
        }
        Ok(())
    }

    /// Validate that a known extension agrees with the declared content type.
    ///
    /// Extensions outside the table are trusted. Content types compare
    /// case-insensitively.
    pub fn validate_consistency(&self, media: &MediaObject) -> Result<(), PipelineError> {
        let Some(extension) = media.extension() else {
            return Ok(());
        };
        let Some(expected) = self.expected_for(&extension) else {
            return Ok(());
        };

        if !media.content_type.trim().eq_ignore_ascii_case(expected) {
            return Err(PipelineError::MimeMismatch {
                path: media.path.clone(),
                extension,
                content_type: media.content_type.clone(),
            });
        }
        Ok(())
    }

    /// Validate that the content type is an image or a video
    pub fn validate_media_kind(&self, media: &MediaObject) -> Result<(), PipelineError> {
        if MediaKind::from_content_type(&media.content_type).is_none() {
            return Err(PipelineError::UnsupportedContentType {
                path: media.path.clone(),
                content_type: media.content_type.clone(),
            });
        }
        Ok(())
    }

    fn expected_for(&self, extension: &str) -> Option<&'static str> {
        self.expected_content_types
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, content_type)| *content_type)
    }
}
