//! Encoding annotations to stored records and back.
//!
//! The payload is self-describing: it repeats the `type` tag alongside the
//! variant fields. Decoding dispatches on the record's `type`, then checks the
//! payload agrees and rebuilds the shape through its validating constructor.

use serde::{Deserialize, Serialize};

use super::error::{CorruptionError, StorageError};
use super::record::StoredRecord;
use crate::model::{
    Annotation, AnnotationKind, AnnotationShape, BoundingBox, Keypoint, KeypointSet, Point,
    Polygon,
};

/// Variant payload as written to the `payload` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ShapePayload {
    #[serde(rename = "boundingBox")]
    BoundingBox {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    #[serde(rename = "polygon")]
    Polygon { points: Vec<Point> },
    #[serde(rename = "keypoint")]
    Keypoint { keypoints: Vec<Keypoint> },
}

impl ShapePayload {
    fn from_shape(shape: &AnnotationShape) -> Self {
        match shape {
            AnnotationShape::BoundingBox(b) => ShapePayload::BoundingBox {
                x: b.x(),
                y: b.y(),
                width: b.width(),
                height: b.height(),
            },
            AnnotationShape::Polygon(p) => ShapePayload::Polygon {
                points: p.points().to_vec(),
            },
            AnnotationShape::Keypoint(k) => ShapePayload::Keypoint {
                keypoints: k.keypoints().to_vec(),
            },
        }
    }

    fn kind(&self) -> AnnotationKind {
        match self {
            ShapePayload::BoundingBox { .. } => AnnotationKind::BoundingBox,
            ShapePayload::Polygon { .. } => AnnotationKind::Polygon,
            ShapePayload::Keypoint { .. } => AnnotationKind::Keypoint,
        }
    }

    fn into_shape(self) -> Result<AnnotationShape, CorruptionError> {
        let shape = match self {
            ShapePayload::BoundingBox {
                x,
                y,
                width,
                height,
            } => AnnotationShape::BoundingBox(BoundingBox::new(x, y, width, height)?),
            ShapePayload::Polygon { points } => AnnotationShape::Polygon(Polygon::new(points)?),
            ShapePayload::Keypoint { keypoints } => {
                AnnotationShape::Keypoint(KeypointSet::new(keypoints)?)
            }
        };
        Ok(shape)
    }
}

/// Encode an annotation into a storage record.
pub fn encode(annotation: &Annotation) -> Result<StoredRecord, StorageError> {
    let payload = serde_json::to_string(&ShapePayload::from_shape(&annotation.shape))
        .map_err(StorageError::Encode)?;
    Ok(StoredRecord {
        id: annotation.id.clone(),
        kind: annotation.kind().as_str().to_string(),
        label_id: annotation.label_id.clone(),
        image_id: annotation.image_id.clone(),
        project_id: annotation.project_id.clone(),
        created_at: annotation.created_at,
        updated_at: annotation.updated_at,
        notes: annotation.notes.clone(),
        payload,
    })
}

/// Decode a storage record, reporting why it is corrupted if it cannot be read.
pub fn decode(record: &StoredRecord) -> Result<Annotation, CorruptionError> {
    if let Some(field) = record.missing_required_field() {
        return Err(CorruptionError::MissingField { field });
    }
    let kind: AnnotationKind = record
        .kind
        .parse()
        .map_err(|_| CorruptionError::UnknownType(record.kind.clone()))?;

    let payload: ShapePayload = serde_json::from_str(&record.payload)?;
    if payload.kind() != kind {
        return Err(CorruptionError::TypeMismatch {
            record: record.kind.clone(),
            payload: payload.kind().as_str().to_string(),
        });
    }
    log::trace!("Decoded {} payload for {}", kind, record.id);

    Ok(Annotation {
        id: record.id.clone(),
        label_id: record.label_id.clone(),
        image_id: record.image_id.clone(),
        project_id: record.project_id.clone(),
        created_at: record.created_at,
        updated_at: record.updated_at,
        notes: record.notes.clone(),
        shape: payload.into_shape()?,
    })
}

/// Decode every record, logging and skipping the ones that are corrupted.
pub fn decode_all(records: &[StoredRecord]) -> Vec<Annotation> {
    records
        .iter()
        .filter_map(|record| match decode(record) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                log::warn!("Skipping corrupted annotation record '{}': {}", record.id, e);
                None
            }
        })
        .collect()
}
