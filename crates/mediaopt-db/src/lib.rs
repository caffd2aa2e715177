//! Mediaopt record store
//!
//! The pipeline reads and deletes records owned by other subsystems (posts that
//! reference an upload) and appends to the moderation audit log. This crate defines
//! that port and its PostgreSQL and in-memory implementations.

pub mod db;

pub use db::pool::{create_pool, run_migrations, MIGRATOR};
pub use db::postgres::PgRecordStore;
pub use db::record_store::{RecordOperation, RecordStore, RecordStoreError, RecordStoreResult};
pub use db::transaction::TransactionGuard;

#[cfg(feature = "memory")]
pub use db::memory::{InMemoryRecordStore, StoredRecord};
