//! Annotation data structures.
//!
//! All geometry is stored in normalized image coordinates (`[0, 1]` on both
//! axes). Shapes can only be built through their validating constructors, so
//! a value of any shape type always satisfies its invariants.

use serde::{Deserialize, Serialize};

use super::tool::{AnnotationKind, MIN_KEYPOINTS, MIN_POLYGON_VERTICES};
use crate::error::ValidationError;

/// Unix time in milliseconds.
pub type Timestamp = i64;

/// Slack allowed on the `x + width <= 1` style checks for float rounding.
const EDGE_EPSILON: f64 = 1e-9;

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> Timestamp {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}

fn check_finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    let value = check_finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

/// A point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check that both axes lie in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit("x", self.x)?;
        check_unit("y", self.y)?;
        Ok(())
    }
}

/// An axis-aligned bounding box (top-left corner plus size).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl BoundingBox {
    /// Build a box, rejecting anything that leaves the unit square or has no area.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        let x = check_unit("x", x)?;
        let y = check_unit("y", y)?;
        let width = check_finite("width", width)?;
        let height = check_finite("height", height)?;

        if width <= 0.0 {
            return Err(ValidationError::NonPositiveSize {
                field: "width",
                value: width,
            });
        }
        if height <= 0.0 {
            return Err(ValidationError::NonPositiveSize {
                field: "height",
                value: height,
            });
        }
        if x + width > 1.0 + EDGE_EPSILON {
            return Err(ValidationError::OutOfRange {
                field: "x + width",
                value: x + width,
            });
        }
        if y + height > 1.0 + EDGE_EPSILON {
            return Err(ValidationError::OutOfRange {
                field: "y + height",
                value: y + height,
            });
        }

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Create a bounding box from two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Result<Self, ValidationError> {
        a.validate()?;
        b.validate()?;
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, a.x.max(b.x) - x, a.y.max(b.y) - y)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Get the top-left corner.
    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Get the bottom-right corner.
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Area as a fraction of the image.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A closed polygon given by its vertices in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Result<Self, ValidationError> {
        if points.len() < MIN_POLYGON_VERTICES {
            return Err(ValidationError::TooFewPoints {
                kind: AnnotationKind::Polygon,
                required: MIN_POLYGON_VERTICES,
                found: points.len(),
            });
        }
        for p in &points {
            p.validate()?;
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Keypoint visibility flag (COCO convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Visibility {
    /// Not labeled / not visible
    NotVisible,
    /// Labeled and visible
    #[default]
    Visible,
    /// Labeled but occluded
    Occluded,
}

impl TryFrom<u8> for Visibility {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Visibility::NotVisible),
            1 => Ok(Visibility::Visible),
            2 => Ok(Visibility::Occluded),
            other => Err(ValidationError::InvalidVisibility(other)),
        }
    }
}

impl From<Visibility> for u8 {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::NotVisible => 0,
            Visibility::Visible => 1,
            Visibility::Occluded => 2,
        }
    }
}

/// A single named keypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub point: Point,
    pub visibility: Visibility,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, point: Point, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            point,
            visibility,
        }
    }
}

/// An ordered, non-empty set of keypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSet {
    keypoints: Vec<Keypoint>,
}

impl KeypointSet {
    pub fn new(keypoints: Vec<Keypoint>) -> Result<Self, ValidationError> {
        if keypoints.len() < MIN_KEYPOINTS {
            return Err(ValidationError::TooFewPoints {
                kind: AnnotationKind::Keypoint,
                required: MIN_KEYPOINTS,
                found: keypoints.len(),
            });
        }
        for kp in &keypoints {
            kp.point.validate()?;
        }
        Ok(Self { keypoints })
    }

    /// Name each point `point_1`, `point_2`, ... and mark it visible.
    pub fn from_points(points: &[Point]) -> Result<Self, ValidationError> {
        Self::new(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| Keypoint::new(format!("point_{}", i + 1), *p, Visibility::Visible))
                .collect(),
        )
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }
}

/// Shape geometry of an annotation, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationShape {
    BoundingBox(BoundingBox),
    Polygon(Polygon),
    Keypoint(KeypointSet),
}

impl AnnotationShape {
    /// Build a shape of `kind` from normalized points.
    ///
    /// Bounding boxes use the first and last point as opposite corners.
    pub fn from_points(kind: AnnotationKind, points: &[Point]) -> Result<Self, ValidationError> {
        if points.len() < kind.min_points() {
            return Err(ValidationError::TooFewPoints {
                kind,
                required: kind.min_points(),
                found: points.len(),
            });
        }
        match kind {
            AnnotationKind::BoundingBox => {
                let (first, last) = (points[0], points[points.len() - 1]);
                BoundingBox::from_corners(first, last).map(AnnotationShape::BoundingBox)
            }
            AnnotationKind::Polygon => Polygon::new(points.to_vec()).map(AnnotationShape::Polygon),
            AnnotationKind::Keypoint => {
                KeypointSet::from_points(points).map(AnnotationShape::Keypoint)
            }
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationShape::BoundingBox(_) => AnnotationKind::BoundingBox,
            AnnotationShape::Polygon(_) => AnnotationKind::Polygon,
            AnnotationShape::Keypoint(_) => AnnotationKind::Keypoint,
        }
    }
}

/// A labeled shape on one image.
///
/// Values are never edited in place; the `with_*` methods return a new value
/// with the same id and a refreshed `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: String,
    pub label_id: String,
    pub image_id: String,
    pub project_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub notes: Option<String>,
    pub shape: AnnotationShape,
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        self.shape.kind()
    }

    /// Replace the geometry.
    pub fn with_shape(self, shape: AnnotationShape, now: Timestamp) -> Self {
        Self {
            shape,
            updated_at: now,
            ..self
        }
    }

    /// Reassign to another label.
    pub fn with_label(self, label_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            label_id: label_id.into(),
            updated_at: now,
            ..self
        }
    }

    /// Replace the free-form notes.
    pub fn with_notes(self, notes: Option<String>, now: Timestamp) -> Self {
        Self {
            notes,
            updated_at: now,
            ..self
        }
    }

    /// Change the visibility of the keypoint at `index`.
    ///
    /// Leaves the annotation untouched if it is not a keypoint set or the
    /// index is out of bounds.
    pub fn with_keypoint_visibility(
        self,
        index: usize,
        visibility: Visibility,
        now: Timestamp,
    ) -> Self {
        let AnnotationShape::Keypoint(set) = &self.shape else {
            return self;
        };
        if index >= set.keypoints.len() {
            return self;
        }
        let mut keypoints = set.keypoints.clone();
        keypoints[index].visibility = visibility;
        let shape = AnnotationShape::Keypoint(KeypointSet { keypoints });
        self.with_shape(shape, now)
    }
}
