//! In-process record store.

use super::RecordStore;
use super::error::StorageError;
use super::record::{RecordFilter, StoredRecord};

/// Insertion-ordered records held in memory.
///
/// Each instance is isolated, which keeps tests hermetic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<StoredRecord>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with raw records, damaged ones included.
    pub fn with_records(records: Vec<StoredRecord>) -> Self {
        Self {
            records,
            closed: false,
        }
    }

    /// Get the number of raw records, including corrupted ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Shared by both backends: replace in place or append.
pub(super) fn upsert(records: &mut Vec<StoredRecord>, record: StoredRecord) {
    match records.iter_mut().find(|r| r.id == record.id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

impl RecordStore for MemoryStore {
    async fn insert(&mut self, record: StoredRecord) -> Result<(), StorageError> {
        self.ensure_open()?;
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(StorageError::DuplicateId { id: record.id });
        }
        self.records.push(record);
        Ok(())
    }

    async fn put(&mut self, record: StoredRecord) -> Result<(), StorageError> {
        self.ensure_open()?;
        upsert(&mut self.records, record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        self.ensure_open()?;
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        self.ensure_open()?;
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        Ok(self.records.len() != before)
    }

    async fn scan(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StorageError> {
        self.ensure_open()?;
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn delete_missing_required(&mut self) -> Result<usize, StorageError> {
        self.ensure_open()?;
        let before = self.records.len();
        self.records.retain(|r| r.missing_required_field().is_none());
        Ok(before - self.records.len())
    }

    async fn delete_ids(&mut self, ids: &[String]) -> Result<usize, StorageError> {
        self.ensure_open()?;
        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        Ok(before - self.records.len())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.closed = true;
        Ok(())
    }
}
