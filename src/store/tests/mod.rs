//! Tests for the record codec and corruption detection.


use crate::model::{Annotation, AnnotationKind, AnnotationShape, Point};

/// Build a valid annotation of `kind` for codec tests.
pub(super) fn sample(kind: AnnotationKind) -> Annotation {
    let points = match kind {
        AnnotationKind::BoundingBox => vec![Point::new(0.1, 0.2), Point::new(0.6, 0.9)],
        AnnotationKind::Polygon => vec![
            Point::new(0.1, 0.1),
            Point::new(0.9, 0.15),
            Point::new(0.5, 0.8),
            Point::new(0.2, 0.6),
        ],
        AnnotationKind::Keypoint => vec![Point::new(0.25, 0.75), Point::new(0.333, 0.125)],
    };
    Annotation {
        id: format!("ann-{}", kind),
        label_id: "label-1".to_string(),
        image_id: "image-1".to_string(),
        project_id: "project-1".to_string(),
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_000_500,
        notes: Some("checked twice".to_string()),
        shape: AnnotationShape::from_points(kind, &points).unwrap(),
    }
}
