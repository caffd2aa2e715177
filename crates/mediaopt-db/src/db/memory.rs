//! In-memory record store
//!
//! Records are flat string maps grouped by collection. Every call is counted, and
//! each operation can be made to fail or to panic, which lets tests drive the
//! quarantine path through record-store outages and crashes.

use crate::db::record_store::{RecordOperation, RecordStore, RecordStoreError, RecordStoreResult};
use async_trait::async_trait;
use chrono::Utc;
use mediaopt_core::constants::MODERATION_LOG_COLLECTION;
use mediaopt_core::{AuditLogEntry, NewAuditLogEntry, RecordRef};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub collection: String,
    pub id: Uuid,
    pub fields: HashMap<String, String>,
}

#[derive(Default)]
struct State {
    records: Vec<StoredRecord>,
    audit: Vec<AuditLogEntry>,
    failing: HashSet<RecordOperation>,
    panicking: HashSet<RecordOperation>,
    calls: HashMap<RecordOperation, usize>,
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    state: Mutex<State>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record with a single field, returning its id.
    pub fn insert(&self, collection: &str, field: &str, value: &str) -> Uuid {
        let id = Uuid::new_v4();
        let mut fields = HashMap::new();
        fields.insert(field.to_string(), value.to_string());
        self.lock().records.push(StoredRecord {
            collection: collection.to_string(),
            id,
            fields,
        });
        id
    }

    pub fn fail_on(&self, operation: RecordOperation) {
        self.lock().failing.insert(operation);
    }

    /// Make `operation` panic instead of returning, as a crashing client would.
    pub fn panic_on(&self, operation: RecordOperation) {
        self.lock().panicking.insert(operation);
    }

    pub fn records(&self, collection: &str) -> Vec<StoredRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| r.collection == collection)
            .cloned()
            .collect()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.lock().audit.clone()
    }

    pub fn call_count(&self, operation: RecordOperation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Batch deletes plus appends.
    pub fn write_count(&self) -> usize {
        self.call_count(RecordOperation::BatchDelete) + self.call_count(RecordOperation::Append)
    }

    /// Count the call and apply any injected failure. The guard is released before a
    /// panic so the store stays usable afterwards.
    fn enter(&self, operation: RecordOperation) -> RecordStoreResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if state.panicking.contains(&operation) {
            drop(state);
            panic!("record store crashed during {}", operation);
        }
        if state.failing.contains(&operation) {
            return Err(RecordStoreError::Unavailable(format!(
                "injected {} failure",
                operation
            )));
        }
        Ok(state)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> RecordStoreResult<Vec<RecordRef>> {
        let state = self.enter(RecordOperation::Query)?;
        Ok(state
            .records
            .iter()
            .filter(|r| r.collection == collection)
            .filter(|r| r.fields.get(field).is_some_and(|v| v == value))
            .map(|r| RecordRef::new(r.collection.clone(), r.id))
            .collect())
    }

    async fn batch_delete(&self, records: &[RecordRef]) -> RecordStoreResult<u64> {
        let mut state = self.enter(RecordOperation::BatchDelete)?;
        let before = state.records.len();
        state.records.retain(|r| {
            !records
                .iter()
                .any(|target| target.id == r.id && target.collection == r.collection)
        });
        Ok((before - state.records.len()) as u64)
    }

    async fn append_audit(
        &self,
        collection: &str,
        entry: &NewAuditLogEntry,
    ) -> RecordStoreResult<RecordRef> {
        let mut state = self.enter(RecordOperation::Append)?;
        if collection != MODERATION_LOG_COLLECTION {
            return Err(RecordStoreError::UnknownCollection(collection.to_string()));
        }
        let id = Uuid::new_v4();
        state
            .audit
            .push(AuditLogEntry::from_new(id, entry.clone(), Utc::now()));
        Ok(RecordRef::new(collection, id))
    }
}
