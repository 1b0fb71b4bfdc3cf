//! Annotation persistence.
//!
//! This module defines the record shape, the codec between records and
//! annotations, and the `RecordStore` trait with two backends:
//!
//! - **`MemoryStore`**: insertion-ordered, in-process; for tests and scratch sessions
//! - **`JsonFileStore`**: a JSON array on disk with an explicit open/close lifecycle
//!
//! Store methods are asynchronous so callers on an interaction thread can
//! await them instead of blocking. The file backend does its disk I/O on a
//! dedicated thread.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labelcanvas::store::{JsonFileStore, RecordFilter, RecordStore, decode_all};
//!
//! let store = JsonFileStore::open("annotations.json").await?;
//! let records = store.scan(&RecordFilter::Image(image_id)).await?;
//! let annotations = decode_all(&records);
//! ```

use std::future::Future;

mod codec;
mod error;
mod file;
mod memory;
mod record;

#[cfg(test)]
mod tests;

pub use codec::{decode, decode_all, encode};
pub use error::{CorruptionError, StorageError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{RecordFilter, StoredRecord};

/// Backend holding stored annotation records.
///
/// Records are returned in insertion order. Implementations only move
/// records around; decoding and corruption handling happen above this layer.
pub trait RecordStore {
    /// Add a new record. Fails with `StorageError::DuplicateId` if the id is taken.
    fn insert(&mut self, record: StoredRecord) -> impl Future<Output = Result<(), StorageError>>;

    /// Insert or replace the record with the same id.
    fn put(&mut self, record: StoredRecord) -> impl Future<Output = Result<(), StorageError>>;

    /// Fetch one record by id.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<StoredRecord>, StorageError>>;

    /// Remove one record by id. Returns whether it existed.
    fn delete(&mut self, id: &str) -> impl Future<Output = Result<bool, StorageError>>;

    /// All records matching `filter`, in insertion order.
    fn scan(
        &self,
        filter: &RecordFilter,
    ) -> impl Future<Output = Result<Vec<StoredRecord>, StorageError>>;

    /// Delete every record with a missing or empty required field.
    fn delete_missing_required(&mut self) -> impl Future<Output = Result<usize, StorageError>>;

    /// Delete all records whose id is in `ids`. Returns how many were removed.
    fn delete_ids(&mut self, ids: &[String]) -> impl Future<Output = Result<usize, StorageError>>;

    /// Release the handle. Later calls fail with `StorageError::Closed`.
    fn close(&mut self) -> impl Future<Output = Result<(), StorageError>>;
}
