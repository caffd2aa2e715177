//! Constants shared across the pipeline, the stores and the CLI.

/// Objects outside this prefix are never processed.
pub const DEFAULT_INTAKE_PREFIX: &str = "uploads/";

/// Reserved metadata key marking an object as already optimized.
pub const PROCESSED_MARKER_KEY: &str = "optimized";
pub const PROCESSED_MARKER_VALUE: &str = "true";

/// Record-store collection holding application posts that reference media.
pub const POSTS_COLLECTION: &str = "posts";
/// Field of a post that stores the referenced object path.
pub const MEDIA_PATH_FIELD: &str = "mediaPath";
/// Append-only audit collection written by quarantine.
pub const MODERATION_LOG_COLLECTION: &str = "media_moderation_logs";

/// Content type of every optimized image.
pub const OPTIMIZED_IMAGE_CONTENT_TYPE: &str = "image/jpeg";
/// Content type of every transcoded video.
pub const OPTIMIZED_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Prefix of the optimized-output copy inside an invocation workspace.
pub const OPTIMIZED_FILE_PREFIX: &str = "opt_";

/// Extension (lowercase, with leading dot) to the only content type it may be declared as.
///
/// Extensions not listed here are not cross-checked.
pub const EXPECTED_CONTENT_TYPES: &[(&str, &str)] = &[
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".webp", "image/webp"),
    (".mp4", "video/mp4"),
];
