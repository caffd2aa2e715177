use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a record owned by another subsystem (e.g. a post).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub collection: String,
    pub id: Uuid,
}

impl RecordRef {
    pub fn new(collection: impl Into<String>, id: Uuid) -> Self {
        Self {
            collection: collection.into(),
            id,
        }
    }
}

/// Audit entry as submitted by quarantine. The timestamp is assigned by the record
/// store when the entry is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditLogEntry {
    pub media_path: String,
    pub deleted_from_storage: bool,
    pub post_deleted: bool,
    pub reason: String,
}

/// Persisted audit entry. Never mutated or deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub media_path: String,
    pub deleted_from_storage: bool,
    pub post_deleted: bool,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn from_new(id: Uuid, entry: NewAuditLogEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            media_path: entry.media_path,
            deleted_from_storage: entry.deleted_from_storage,
            post_deleted: entry.post_deleted,
            reason: entry.reason,
            timestamp,
        }
    }
}
