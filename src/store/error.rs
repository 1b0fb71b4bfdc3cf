//! Error types for annotation persistence.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ValidationError;

/// The store cannot be reached or written.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file exists but is not a readable record list
    #[error("unreadable store file {path:?}: {source}")]
    Unreadable {
        /// Path of the store file
        path: PathBuf,
        /// Parse failure
        source: serde_json::Error,
    },

    /// A record could not be serialized
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// The handle was closed before this call
    #[error("store is closed")]
    Closed,

    /// Insert of an id that is already stored
    #[error("record '{id}' already exists")]
    DuplicateId {
        /// The clashing id
        id: String,
    },

    /// The background I/O thread is gone
    #[error("store I/O thread stopped")]
    WorkerStopped,
}

/// A stored record cannot be turned back into an annotation.
#[derive(Error, Debug)]
pub enum CorruptionError {
    /// Required field is missing or empty
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// The record's `type` column is not a known kind
    #[error("unknown annotation type '{0}'")]
    UnknownType(String),

    /// Payload is not valid JSON for any shape
    #[error("payload does not decode: {0}")]
    Payload(#[from] serde_json::Error),

    /// Payload describes a different kind than the record
    #[error("payload type '{payload}' does not match record type '{record}'")]
    TypeMismatch {
        /// Kind named by the record
        record: String,
        /// Kind named inside the payload
        payload: String,
    },

    /// Payload decodes but breaks a geometry invariant
    #[error("payload violates invariant: {0}")]
    Invalid(#[from] ValidationError),
}
