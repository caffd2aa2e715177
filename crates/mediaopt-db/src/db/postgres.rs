use crate::db::record_store::{RecordStore, RecordStoreError, RecordStoreResult};
use crate::db::transaction::TransactionGuard;
use async_trait::async_trait;
use mediaopt_core::constants::{MEDIA_PATH_FIELD, MODERATION_LOG_COLLECTION, POSTS_COLLECTION};
use mediaopt_core::{NewAuditLogEntry, RecordRef};
use sqlx::{PgPool, Postgres};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Table backing a collection. Only known collections can be addressed so that table
/// names spliced into SQL never come from input.
fn table_for(collection: &str) -> RecordStoreResult<&'static str> {
    match collection {
        POSTS_COLLECTION => Ok("posts"),
        MODERATION_LOG_COLLECTION => Ok("media_moderation_logs"),
        other => Err(RecordStoreError::UnknownCollection(other.to_string())),
    }
}

fn column_for(collection: &str, field: &str) -> RecordStoreResult<&'static str> {
    match (collection, field) {
        (POSTS_COLLECTION, MEDIA_PATH_FIELD) | (MODERATION_LOG_COLLECTION, MEDIA_PATH_FIELD) => {
            Ok("media_path")
        }
        (POSTS_COLLECTION, "id") | (MODERATION_LOG_COLLECTION, "id") => Ok("id"),
        _ => Err(RecordStoreError::UnknownField {
            collection: collection.to_string(),
            field: field.to_string(),
        }),
    }
}

/// PostgreSQL-backed record store
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[tracing::instrument(skip(self), fields(db.operation = "select"))]
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> RecordStoreResult<Vec<RecordRef>> {
        let table = table_for(collection)?;
        let column = column_for(collection, field)?;
        let sql = format!("SELECT id FROM {} WHERE {}::text = $1", table, column);

        let ids = sqlx::query_scalar::<Postgres, Uuid>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids
            .into_iter()
            .map(|id| RecordRef::new(collection, id))
            .collect())
    }

    #[tracing::instrument(skip(self, records), fields(db.operation = "delete", record_count = records.len()))]
    async fn batch_delete(&self, records: &[RecordRef]) -> RecordStoreResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        // Resolve every table before touching the database so an unknown collection
        // fails the whole batch up front.
        let mut by_table: BTreeMap<&'static str, Vec<Uuid>> = BTreeMap::new();
        for record in records {
            by_table
                .entry(table_for(&record.collection)?)
                .or_default()
                .push(record.id);
        }

        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let mut deleted = 0;
        for (table, ids) in &by_table {
            let sql = format!("DELETE FROM {} WHERE id = ANY($1)", table);
            let result = sqlx::query::<Postgres>(&sql)
                .bind(&ids[..])
                .execute(tx.connection()?)
                .await;
            match result {
                Ok(done) => deleted += done.rows_affected(),
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e.into());
                }
            }
        }
        tx.commit().await?;

        tracing::info!(deleted = deleted, "Batch delete committed");
        Ok(deleted)
    }

    #[tracing::instrument(skip(self, entry), fields(db.operation = "insert", media_path = %entry.media_path))]
    async fn append_audit(
        &self,
        collection: &str,
        entry: &NewAuditLogEntry,
    ) -> RecordStoreResult<RecordRef> {
        if collection != MODERATION_LOG_COLLECTION {
            return Err(RecordStoreError::UnknownCollection(collection.to_string()));
        }

        // "timestamp" takes its server-side default.
        let id = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO media_moderation_logs (media_path, deleted_from_storage, post_deleted, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&entry.media_path)
        .bind(entry.deleted_from_storage)
        .bind(entry.post_deleted)
        .bind(&entry.reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(RecordRef::new(collection, id))
    }
}
