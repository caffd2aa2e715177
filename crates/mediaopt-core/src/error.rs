//! Error types module
//!
//! Every failure that can happen after the guard filter is one of the closed set of
//! variants of [`PipelineError`]. Each variant carries the object path and the
//! structured context of the failure, so the quarantine handler can branch on
//! [`ErrorKind`] instead of parsing messages. Skipping an event is not an error and
//! has no variant here.

use std::fmt;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected rejections (bad input from the uploader)
    Warn,
    /// Unexpected failures of an encoder or an external store
    Error,
}

/// Machine-readable failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CorruptInput,
    MimeMismatch,
    UnsupportedContentType,
    TranscodeFailure,
    StorageFailure,
    RecordStoreFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::CorruptInput => "corrupt_input",
            ErrorKind::MimeMismatch => "mime_mismatch",
            ErrorKind::UnsupportedContentType => "unsupported_content_type",
            ErrorKind::TranscodeFailure => "transcode_failure",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::RecordStoreFailure => "record_store_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object-store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    Download,
    Upload,
    Delete,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageOperation::Download => "download",
            StorageOperation::Upload => "upload",
            StorageOperation::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("Corrupt file: zero size ({path})")]
    CorruptInput { path: String },

    #[error("Inconsistent mimetype: extension is '{extension}' but content type is '{content_type}'")]
    MimeMismatch {
        path: String,
        extension: String,
        content_type: String,
    },

    #[error("Invalid content type: {content_type}")]
    UnsupportedContentType { path: String, content_type: String },

    #[error("Transcode failed: {message}")]
    TranscodeFailure { path: String, message: String },

    #[error("Storage {operation} failed for {path}: {message}")]
    StorageFailure {
        path: String,
        operation: StorageOperation,
        message: String,
    },

    #[error("Record store {operation} failed: {message}")]
    RecordStoreFailure { operation: String, message: String },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::CorruptInput { .. } => ErrorKind::CorruptInput,
            PipelineError::MimeMismatch { .. } => ErrorKind::MimeMismatch,
            PipelineError::UnsupportedContentType { .. } => ErrorKind::UnsupportedContentType,
            PipelineError::TranscodeFailure { .. } => ErrorKind::TranscodeFailure,
            PipelineError::StorageFailure { .. } => ErrorKind::StorageFailure,
            PipelineError::RecordStoreFailure { .. } => ErrorKind::RecordStoreFailure,
        }
    }

    /// Object path the failure refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            PipelineError::CorruptInput { path }
            | PipelineError::MimeMismatch { path, .. }
            | PipelineError::UnsupportedContentType { path, .. }
            | PipelineError::TranscodeFailure { path, .. }
            | PipelineError::StorageFailure { path, .. } => Some(path),
            PipelineError::RecordStoreFailure { .. } => None,
        }
    }

    /// Human-readable reason written to the audit log.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::CorruptInput { .. }
            | PipelineError::MimeMismatch { .. }
            | PipelineError::UnsupportedContentType { .. } => LogLevel::Warn,
            PipelineError::TranscodeFailure { .. }
            | PipelineError::StorageFailure { .. }
            | PipelineError::RecordStoreFailure { .. } => LogLevel::Error,
        }
    }

    pub fn storage(
        path: impl Into<String>,
        operation: StorageOperation,
        message: impl fmt::Display,
    ) -> Self {
        PipelineError::StorageFailure {
            path: path.into(),
            operation,
            message: message.to_string(),
        }
    }

    pub fn transcode(path: impl Into<String>, message: impl fmt::Display) -> Self {
        PipelineError::TranscodeFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
