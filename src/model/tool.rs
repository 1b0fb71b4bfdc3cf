//! Annotation kinds and the drawing tools that produce them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum number of points for a bounding box (two corners).
pub const MIN_BBOX_POINTS: usize = 2;

/// Minimum number of vertices required for a valid polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Minimum number of keypoints in a keypoint set.
///
/// A single tap commits one keypoint.
pub const MIN_KEYPOINTS: usize = 1;

/// Discriminant of the annotation tagged union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationKind {
    #[serde(rename = "boundingBox")]
    BoundingBox,
    #[serde(rename = "polygon")]
    Polygon,
    #[serde(rename = "keypoint")]
    Keypoint,
}

impl AnnotationKind {
    /// Every kind, in display order.
    pub const ALL: [AnnotationKind; 3] = [
        AnnotationKind::BoundingBox,
        AnnotationKind::Polygon,
        AnnotationKind::Keypoint,
    ];

    /// Tag used in stored records and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::BoundingBox => "boundingBox",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Keypoint => "keypoint",
        }
    }

    /// Minimum number of raw points needed to build this kind.
    ///
    /// Both the interaction state machine and the service read this, so the
    /// two can never disagree.
    pub fn min_points(&self) -> usize {
        match self {
            AnnotationKind::BoundingBox => MIN_BBOX_POINTS,
            AnnotationKind::Polygon => MIN_POLYGON_VERTICES,
            AnnotationKind::Keypoint => MIN_KEYPOINTS,
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown annotation type '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for AnnotationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Drawing tools available on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnotationTool {
    /// No tool armed; the canvas only selects.
    #[default]
    None,
    /// Drag out a box from one corner to the other
    BoundingBox,
    /// Drag to trace polygon vertices
    Polygon,
    /// Tap or drag to place keypoints
    Keypoint,
}

impl AnnotationTool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationTool::None => "None",
            AnnotationTool::BoundingBox => "Bounding Box",
            AnnotationTool::Polygon => "Polygon",
            AnnotationTool::Keypoint => "Keypoint",
        }
    }

    /// The kind of annotation this tool produces, if any.
    pub fn kind(&self) -> Option<AnnotationKind> {
        match self {
            AnnotationTool::None => None,
            AnnotationTool::BoundingBox => Some(AnnotationKind::BoundingBox),
            AnnotationTool::Polygon => Some(AnnotationKind::Polygon),
            AnnotationTool::Keypoint => Some(AnnotationKind::Keypoint),
        }
    }

    /// Check if this tool draws shapes (not `None`).
    pub fn is_drawing_tool(&self) -> bool {
        self.kind().is_some()
    }
}

impl From<AnnotationKind> for AnnotationTool {
    fn from(kind: AnnotationKind) -> Self {
        match kind {
            AnnotationKind::BoundingBox => AnnotationTool::BoundingBox,
            AnnotationKind::Polygon => AnnotationTool::Polygon,
            AnnotationKind::Keypoint => AnnotationTool::Keypoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_parse_back() {
        for kind in AnnotationKind::ALL {
            assert_eq!(kind.as_str().parse::<AnnotationKind>(), Ok(kind));
        }
        assert!("circle".parse::<AnnotationKind>().is_err());
        assert!("".parse::<AnnotationKind>().is_err());
    }

    #[test]
    fn test_kind_serde_matches_tag() {
        let json = serde_json::to_string(&AnnotationKind::BoundingBox).unwrap();
        assert_eq!(json, "\"boundingBox\"");
    }

    #[test]
    fn test_min_points() {
        assert_eq!(AnnotationKind::BoundingBox.min_points(), 2);
        assert_eq!(AnnotationKind::Polygon.min_points(), 3);
        assert_eq!(AnnotationKind::Keypoint.min_points(), 1);
    }

    #[test]
    fn test_none_tool_has_no_kind() {
        assert_eq!(AnnotationTool::None.kind(), None);
        assert!(!AnnotationTool::None.is_drawing_tool());
        assert_eq!(
            AnnotationTool::from(AnnotationKind::Polygon).kind(),
            Some(AnnotationKind::Polygon)
        );
    }
}
