//! labelcanvas - annotation core for image labeling
//!
//! Bounding boxes, polygons and keypoint sets drawn over raster images,
//! stored in normalized coordinates.
//!
//! - `model`: the annotation tagged union and its validating constructors
//! - `geometry`: canvas space to normalized space and back
//! - `hit_test`: which annotation is under the pointer
//! - `interaction`: the drawing/selection state machine
//! - `store`: records, codec, corruption detection and storage backends
//! - `service`: create/update/delete/query/repair with image status upkeep

pub mod config;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod interaction;
pub mod model;
pub mod registry;
pub mod service;
pub mod store;
pub mod supersede;

pub use config::{AnnotatorConfig, LogLevel};
pub use error::{ServiceError, ValidationError};
pub use geometry::{CanvasPoint, FrameSize};
pub use interaction::{InteractionEvent, InteractionSession, InteractionState};
pub use model::{Annotation, AnnotationKind, AnnotationShape, AnnotationTool, Point};
pub use service::{AnnotationService, DrawRequest};
