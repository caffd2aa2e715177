//! Mediaopt Core Library
//!
//! This crate provides the domain model, error taxonomy, constants and configuration
//! shared by every mediaopt component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, DeploymentLimits, LogFormat, PipelineConfig};
pub use error::{ErrorKind, LogLevel, PipelineError, StorageOperation};
pub use models::{
    AuditLogEntry, MediaKind, MediaObject, NewAuditLogEntry, OptimizedArtifact, RecordRef,
    UploadEvent,
};
pub use storage_types::StorageBackend;
