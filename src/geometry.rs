//! Conversion between canvas space and normalized image space.
//!
//! Canvas space is the device-pixel space of the currently rendered surface.
//! Normalized space expresses positions relative to the image, independent of
//! display scale.

use crate::error::ValidationError;
use crate::model::Point;

/// A point in canvas (device pixel) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &CanvasPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Rendered extent of the canvas in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A frame that has not been laid out yet.
    pub fn unknown() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Whether the frame has a usable, non-zero extent.
    pub fn is_laid_out(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    fn require_laid_out(&self) -> Result<(), ValidationError> {
        if self.is_laid_out() {
            Ok(())
        } else {
            Err(ValidationError::EmptyFrame {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Convert a canvas point to normalized coordinates, clamping to `[0, 1]`.
///
/// Fails with `EmptyFrame` before layout instead of producing NaN or zero.
pub fn to_normalized(point: CanvasPoint, frame: FrameSize) -> Result<Point, ValidationError> {
    frame.require_laid_out()?;
    if !point.x.is_finite() {
        return Err(ValidationError::NonFinite { field: "x" });
    }
    if !point.y.is_finite() {
        return Err(ValidationError::NonFinite { field: "y" });
    }
    Ok(Point::new(
        (point.x / frame.width).clamp(0.0, 1.0),
        (point.y / frame.height).clamp(0.0, 1.0),
    ))
}

/// Normalize a whole gesture.
pub fn normalize_all(
    points: &[CanvasPoint],
    frame: FrameSize,
) -> Result<Vec<Point>, ValidationError> {
    points.iter().map(|p| to_normalized(*p, frame)).collect()
}

/// Convert a normalized point back to canvas space.
pub fn to_canvas(point: Point, frame: FrameSize) -> CanvasPoint {
    CanvasPoint::new(point.x * frame.width, point.y * frame.height)
}
