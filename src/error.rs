//! Error types for annotation operations.
//!
//! Validation failures are reported synchronously and never retried.
//! Storage failures are hard failures owned by the caller. Corrupted records
//! live in `store::CorruptionError` and only surface through repair counts.

use thiserror::Error;

use crate::model::AnnotationKind;
use crate::store::{CorruptionError, StorageError};

/// A geometry, tool or label precondition was not met.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Not enough points to build the requested shape
    #[error("{kind} needs at least {required} points, got {found}")]
    TooFewPoints {
        /// Shape kind being built
        kind: AnnotationKind,
        /// Minimum number of points for this kind
        required: usize,
        /// Number of points supplied
        found: usize,
    },

    /// The "none" tool cannot produce an annotation
    #[error("no drawing tool selected")]
    InvalidTool,

    /// A normalized coordinate lies outside `[0, 1]`
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// Width or height is zero or negative
    #[error("{field} must be positive, got {value}")]
    NonPositiveSize {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// NaN or infinite coordinate
    #[error("{field} is not a finite number")]
    NonFinite {
        /// Name of the offending field
        field: &'static str,
    },

    /// Visibility flag outside 0, 1, 2
    #[error("invalid keypoint visibility {0} (expected 0, 1 or 2)")]
    InvalidVisibility(u8),

    /// The canvas has no extent yet, so points cannot be normalized
    #[error("canvas has not been laid out yet ({width}x{height})")]
    EmptyFrame {
        /// Frame width in device pixels
        width: f64,
        /// Frame height in device pixels
        height: f64,
    },

    /// A gesture was committed while no label was selected
    #[error("select a label before drawing")]
    NoLabelSelected,

    /// The label registry does not know this label
    #[error("label '{0}' does not exist")]
    UnknownLabel(String),

    /// The project registry does not know this project
    #[error("project '{0}' does not exist")]
    UnknownProject(String),
}

/// Errors returned by `AnnotationService`.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Input rejected before anything was persisted
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Underlying store is unavailable
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),

    /// A single requested record exists but cannot be decoded
    #[error("annotation {id} is corrupted: {source}")]
    Corrupted {
        /// Id of the unreadable record
        id: String,
        /// Why decoding failed
        source: CorruptionError,
    },

    /// No annotation with this id
    #[error("annotation not found: {id}")]
    NotFound {
        /// The missing id
        id: String,
    },
}

impl ServiceError {
    /// Whether the session can carry on after showing a message.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ServiceError::Storage(_))
    }

    /// Message suitable for showing to the user.
    ///
    /// Validation failures are specific; storage failures stay generic.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(e) => e.to_string(),
            ServiceError::Storage(_) => "Operation failed".to_string(),
            ServiceError::Corrupted { .. } => "This annotation could not be read".to_string(),
            ServiceError::NotFound { .. } => "Annotation no longer exists".to_string(),
        }
    }
}
