//! Domain models

pub mod media;
pub mod records;

pub use media::{is_marked_processed, MediaKind, MediaObject, OptimizedArtifact, UploadEvent};
pub use records::{AuditLogEntry, NewAuditLogEntry, RecordRef};
