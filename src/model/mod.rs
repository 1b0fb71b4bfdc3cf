//! Annotation data model.

mod annotation;
mod tool;

pub use annotation::{
    Annotation, AnnotationShape, BoundingBox, Keypoint, KeypointSet, Point, Polygon, Timestamp,
    Visibility, now_millis,
};
pub use tool::{
    AnnotationKind, AnnotationTool, MIN_BBOX_POINTS, MIN_KEYPOINTS, MIN_POLYGON_VERTICES,
    UnknownKind,
};
