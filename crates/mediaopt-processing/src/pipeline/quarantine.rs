//! Quarantine & audit
//!
//! Runs once per failed invocation. Every side effect is attempted independently,
//! its outcome recorded, and nothing is propagated: the object delete, the dependent
//! record delete and the audit append each log their own failure and move on. The
//! audit entry is written last and summarises the two before it.

use mediaopt_core::constants::{MEDIA_PATH_FIELD, MODERATION_LOG_COLLECTION, POSTS_COLLECTION};
use mediaopt_core::{LogLevel, MediaObject, NewAuditLogEntry, PipelineError};
use mediaopt_db::RecordStore;
use mediaopt_storage::Storage;

use super::context::PipelineContext;

/// Outcome of one quarantine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuarantineReport {
    /// The store delete was attempted. Always true once quarantine runs.
    pub deleted_from_storage: bool,
    /// The store delete call itself succeeded.
    pub storage_delete_succeeded: bool,
    /// Dependent records existed and the batch delete committed.
    pub post_deleted: bool,
    pub dependents_found: usize,
    pub audit_appended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub attempted: bool,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependentsOutcome {
    pub found: usize,
    pub deleted: bool,
}

/// Delete the offending object. Failures are logged, not returned.
pub async fn attempt_delete_object(storage: &dyn Storage, bucket: &str, path: &str) -> DeleteOutcome {
    match storage.delete(bucket, path).await {
        Ok(()) => {
            tracing::info!(bucket = %bucket, path = %path, "Quarantined object deleted");
            DeleteOutcome {
                attempted: true,
                succeeded: true,
            }
        }
        Err(e) => {
            tracing::error!(bucket = %bucket, path = %path, error = %e, "Failed to delete quarantined object");
            DeleteOutcome {
                attempted: true,
                succeeded: false,
            }
        }
    }
}

/// Find posts referencing `path` and delete them in one atomic batch.
pub async fn attempt_delete_dependents(records: &dyn RecordStore, path: &str) -> DependentsOutcome {
    let dependents = match records
        .query_by_field(POSTS_COLLECTION, MEDIA_PATH_FIELD, path)
        .await
    {
        Ok(dependents) => dependents,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to query dependent records");
            return DependentsOutcome::default();
        }
    };

    if dependents.is_empty() {
        return DependentsOutcome::default();
    }

    match records.batch_delete(&dependents).await {
        Ok(deleted) => {
            tracing::info!(path = %path, found = dependents.len(), deleted = deleted, "Dependent records deleted");
            // Ok(0): the posts vanished between the query and the delete
            DependentsOutcome {
                found: dependents.len(),
                deleted: deleted > 0,
            }
        }
        Err(e) => {
            tracing::error!(path = %path, found = dependents.len(), error = %e, "Failed to delete dependent records");
            DependentsOutcome {
                found: dependents.len(),
                deleted: false,
            }
        }
    }
}

/// Append the audit entry. Returns whether it was written.
pub async fn attempt_append_audit(records: &dyn RecordStore, entry: &NewAuditLogEntry) -> bool {
    match records.append_audit(MODERATION_LOG_COLLECTION, entry).await {
        Ok(reference) => {
            tracing::info!(path = %entry.media_path, audit_id = %reference.id, "Moderation log entry appended");
            true
        }
        Err(e) => {
            tracing::error!(path = %entry.media_path, error = %e, "Failed to append moderation log entry");
            false
        }
    }
}

/// Quarantine `media` after `error`.
#[tracing::instrument(skip(ctx, media, error), fields(path = %media.path, kind = %error.kind()))]
pub async fn quarantine(
    ctx: &PipelineContext,
    media: &MediaObject,
    error: &PipelineError,
) -> QuarantineReport {
    let reason = error.reason();
    match error.log_level() {
        LogLevel::Warn => tracing::warn!(reason = %reason, "Upload rejected"),
        LogLevel::Error => tracing::error!(reason = %reason, "Upload rejected"),
    }

    let deleted = attempt_delete_object(ctx.storage.as_ref(), &media.bucket, &media.path).await;
    let dependents = attempt_delete_dependents(ctx.records.as_ref(), &media.path).await;

    let entry = NewAuditLogEntry {
        media_path: media.path.clone(),
        deleted_from_storage: deleted.attempted,
        post_deleted: dependents.deleted,
        reason,
    };
    let audit_appended = attempt_append_audit(ctx.records.as_ref(), &entry).await;

    QuarantineReport {
        deleted_from_storage: deleted.attempted,
        storage_delete_succeeded: deleted.succeeded,
        post_deleted: dependents.deleted,
        dependents_found: dependents.found,
        audit_appended,
    }
}
