//! Finding the annotation under a pointer.
//!
//! Tests run in canvas space: stored shapes are denormalized into the same
//! space as the probe before comparison.

use crate::geometry::{CanvasPoint, FrameSize, to_canvas};
use crate::model::{Annotation, AnnotationShape, BoundingBox, KeypointSet, Polygon};

/// Hit radius for keypoint selection (in device pixels).
pub const KEYPOINT_HIT_RADIUS: f64 = 10.0;

/// Find the topmost annotation containing `probe`.
///
/// `annotations` is in creation order; later entries are drawn on top, so the
/// search runs from the back and the newest shape wins overlaps.
pub fn hit_test<'a>(
    probe: CanvasPoint,
    annotations: &'a [Annotation],
    frame: FrameSize,
) -> Option<&'a Annotation> {
    hit_test_with_radius(probe, annotations, frame, KEYPOINT_HIT_RADIUS)
}

/// Like [`hit_test`] with a custom keypoint radius.
pub fn hit_test_with_radius<'a>(
    probe: CanvasPoint,
    annotations: &'a [Annotation],
    frame: FrameSize,
    keypoint_radius: f64,
) -> Option<&'a Annotation> {
    if !frame.is_laid_out() {
        return None;
    }
    annotations
        .iter()
        .rev()
        .find(|ann| shape_contains(&ann.shape, probe, frame, keypoint_radius))
}

/// Check if a canvas point is inside/on a shape.
pub fn shape_contains(
    shape: &AnnotationShape,
    probe: CanvasPoint,
    frame: FrameSize,
    keypoint_radius: f64,
) -> bool {
    match shape {
        AnnotationShape::BoundingBox(bbox) => bbox_contains(bbox, probe, frame),
        AnnotationShape::Polygon(poly) => polygon_contains(poly, probe, frame),
        AnnotationShape::Keypoint(set) => keypoint_near(set, probe, frame, keypoint_radius),
    }
}

fn bbox_contains(bbox: &BoundingBox, probe: CanvasPoint, frame: FrameSize) -> bool {
    let a = to_canvas(bbox.top_left(), frame);
    let b = to_canvas(bbox.bottom_right(), frame);
    let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
    let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
    probe.x >= min_x && probe.x <= max_x && probe.y >= min_y && probe.y <= max_y
}

/// Even-odd ray casting.
fn polygon_contains(poly: &Polygon, probe: CanvasPoint, frame: FrameSize) -> bool {
    let vertices: Vec<CanvasPoint> = poly.points().iter().map(|p| to_canvas(*p, frame)).collect();
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (vi, vj) = (vertices[i], vertices[j]);
        if ((vi.y > probe.y) != (vj.y > probe.y))
            && (probe.x < (vj.x - vi.x) * (probe.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn keypoint_near(set: &KeypointSet, probe: CanvasPoint, frame: FrameSize, radius: f64) -> bool {
    set.keypoints()
        .iter()
        .any(|kp| to_canvas(kp.point, frame).distance_to(&probe) <= radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnotationKind, Point};

    fn annotation(id: &str, kind: AnnotationKind, points: &[Point]) -> Annotation {
        Annotation {
            id: id.to_string(),
            label_id: "label".to_string(),
            image_id: "image".to_string(),
            project_id: "project".to_string(),
            created_at: 0,
            updated_at: 0,
            notes: None,
            shape: AnnotationShape::from_points(kind, points).unwrap(),
        }
    }

    fn frame() -> FrameSize {
        FrameSize::new(100.0, 100.0)
    }

    #[test]
    fn test_probe_inside_rectangle() {
        let anns = vec![annotation(
            "box",
            AnnotationKind::BoundingBox,
            &[Point::new(0.1, 0.1), Point::new(0.5, 0.6)],
        )];
        let hit = hit_test(CanvasPoint::new(30.0, 30.0), &anns, frame());
        assert_eq!(hit.map(|a| a.id.as_str()), Some("box"));
        assert!(hit_test(CanvasPoint::new(80.0, 80.0), &anns, frame()).is_none());
    }

    #[test]
    fn test_newest_shape_wins_overlap() {
        let anns = vec![
            annotation(
                "old",
                AnnotationKind::BoundingBox,
                &[Point::new(0.0, 0.0), Point::new(0.5, 0.5)],
            ),
            annotation(
                "new",
                AnnotationKind::BoundingBox,
                &[Point::new(0.2, 0.2), Point::new(0.6, 0.6)],
            ),
        ];
        let hit = hit_test(CanvasPoint::new(30.0, 30.0), &anns, frame());
        assert_eq!(hit.map(|a| a.id.as_str()), Some("new"));
        // Only the old one covers this corner
        let hit = hit_test(CanvasPoint::new(10.0, 10.0), &anns, frame());
        assert_eq!(hit.map(|a| a.id.as_str()), Some("old"));
    }

    #[test]
    fn test_polygon_ray_casting() {
        // Concave "L" shape
        let anns = vec![annotation(
            "poly",
            AnnotationKind::Polygon,
            &[
                Point::new(0.0, 0.0),
                Point::new(0.5, 0.0),
                Point::new(0.5, 0.2),
                Point::new(0.2, 0.2),
                Point::new(0.2, 0.5),
                Point::new(0.0, 0.5),
            ],
        )];
        assert!(hit_test(CanvasPoint::new(10.0, 40.0), &anns, frame()).is_some());
        assert!(hit_test(CanvasPoint::new(40.0, 10.0), &anns, frame()).is_some());
        // Inside the notch of the L
        assert!(hit_test(CanvasPoint::new(40.0, 40.0), &anns, frame()).is_none());
    }

    #[test]
    fn test_keypoint_radius() {
        let anns = vec![annotation(
            "kp",
            AnnotationKind::Keypoint,
            &[Point::new(0.5, 0.5)],
        )];
        assert!(hit_test(CanvasPoint::new(56.0, 56.0), &anns, frame()).is_some());
        assert!(hit_test(CanvasPoint::new(58.0, 58.0), &anns, frame()).is_none());
    }

    #[test]
    fn test_radius_is_in_device_pixels() {
        // Same normalized point, bigger canvas: 10px is a smaller normalized distance
        let anns = vec![annotation(
            "kp",
            AnnotationKind::Keypoint,
            &[Point::new(0.5, 0.5)],
        )];
        let big = FrameSize::new(1000.0, 1000.0);
        assert!(hit_test(CanvasPoint::new(508.0, 500.0), &anns, big).is_some());
        assert!(hit_test(CanvasPoint::new(520.0, 500.0), &anns, big).is_none());
    }

    #[test]
    fn test_empty_list_and_unknown_frame() {
        assert!(hit_test(CanvasPoint::new(1.0, 1.0), &[], frame()).is_none());
        let anns = vec![annotation(
            "box",
            AnnotationKind::BoundingBox,
            &[Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
        )];
        assert!(hit_test(CanvasPoint::new(0.0, 0.0), &anns, FrameSize::unknown()).is_none());
    }
}
