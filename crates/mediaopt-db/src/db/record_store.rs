//! Record Store port
//!
//! Collections and fields are addressed by the names the rest of the system uses
//! (`posts`, `mediaPath`, `media_moderation_logs`). Backends map them onto their own
//! schema.

use async_trait::async_trait;
use mediaopt_core::{NewAuditLogEntry, RecordRef};
use std::fmt;
use thiserror::Error;

/// Record store call, used in error context and by test backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordOperation {
    Query,
    BatchDelete,
    Append,
}

impl fmt::Display for RecordOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordOperation::Query => "query",
            RecordOperation::BatchDelete => "batch_delete",
            RecordOperation::Append => "append",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Unknown field '{field}' in collection '{collection}'")]
    UnknownField { collection: String, field: String },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

/// Structured record store consumed by quarantine.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// References to every record in `collection` whose `field` equals `value`.
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> RecordStoreResult<Vec<RecordRef>>;

    /// Delete all referenced records in one atomic batch. Either every record that
    /// still exists is deleted, or none is. Returns the number of records removed.
    async fn batch_delete(&self, records: &[RecordRef]) -> RecordStoreResult<u64>;

    /// Append one entry to the audit collection. The store assigns the id and the
    /// timestamp.
    async fn append_audit(
        &self,
        collection: &str,
        entry: &NewAuditLogEntry,
    ) -> RecordStoreResult<RecordRef>;
}
