//! Database transaction utilities
//!
//! Multi-record deletes must be all-or-nothing. [`TransactionGuard`] wraps a sqlx
//! transaction and makes the commit explicit: a guard dropped without `commit` is
//! rolled back by sqlx when the connection returns to the pool.

use crate::db::record_store::{RecordStoreError, RecordStoreResult};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> RecordStoreResult<Self> {
        let transaction = pool.begin().await.map_err(|e| {
            RecordStoreError::Transaction(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection to run statements on inside the transaction.
    pub fn connection(&mut self) -> RecordStoreResult<&mut PgConnection> {
        match self.transaction.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(RecordStoreError::Transaction(
                "Transaction was already committed or rolled back".to_string(),
            )),
        }
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> RecordStoreResult<()> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await.map_err(|e| {
                RecordStoreError::Transaction(format!("Failed to commit transaction: {}", e))
            })?;
        }
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(mut self) -> RecordStoreResult<()> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await.map_err(|e| {
                RecordStoreError::Transaction(format!("Failed to rollback transaction: {}", e))
            })?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!("Transaction dropped without explicit commit or rollback - rolling back");
        }
    }
}
