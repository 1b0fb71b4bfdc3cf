//! Annotation service: the single entry point for changing annotations.
//!
//! The service turns committed gestures into validated annotations, persists
//! them, and keeps each image's annotation status in line with what is
//! stored. Counts are always re-derived from the stored set, never adjusted
//! incrementally, so lost or repeated calls cannot make them drift.

use std::collections::BTreeMap;

use crate::error::{ServiceError, ValidationError};
use crate::geometry::{CanvasPoint, FrameSize, normalize_all};
use crate::model::{Annotation, AnnotationKind, AnnotationShape, AnnotationTool, now_millis};
use crate::registry::{ImageRegistry, Label, LabelRegistry, ProjectRegistry};
use crate::store::{RecordFilter, RecordStore, decode, decode_all, encode};

/// Everything the service needs from its collaborators.
pub trait Registries: LabelRegistry + ImageRegistry + ProjectRegistry {}

impl<T: LabelRegistry + ImageRegistry + ProjectRegistry> Registries for T {}

/// A committed gesture to be turned into an annotation.
#[derive(Debug, Clone)]
pub struct DrawRequest<'a> {
    pub image_id: &'a str,
    pub project_id: &'a str,
    /// Label chosen in the label registry, if any
    pub label: Option<&'a Label>,
    pub tool: AnnotationTool,
    /// Gesture points in canvas space
    pub points: &'a [CanvasPoint],
    /// Canvas extent the points were captured in
    pub frame: FrameSize,
    pub notes: Option<String>,
}

/// Creates, updates, deletes and queries annotations.
#[derive(Debug)]
pub struct AnnotationService<S, R> {
    store: S,
    registry: R,
}

impl<S: RecordStore, R: Registries> AnnotationService<S, R> {
    /// Create a service over an already opened store.
    pub fn new(store: S, registry: R) -> Self {
        Self { store, registry }
    }

    /// Access the collaborators.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Close the store, ending the service.
    pub async fn close(mut self) -> Result<(), ServiceError> {
        self.store.close().await?;
        Ok(())
    }

    /// Build, validate and persist an annotation from a committed gesture.
    ///
    /// This is the one place minimum point counts are enforced.
    pub async fn create(&mut self, request: DrawRequest<'_>) -> Result<Annotation, ServiceError> {
        let kind = request.tool.kind().ok_or(ValidationError::InvalidTool)?;
        let label = request.label.ok_or(ValidationError::NoLabelSelected)?;
        if !self.registry.label_exists(&label.id) {
            return Err(ValidationError::UnknownLabel(label.id.clone()).into());
        }
        if !self.registry.project_exists(request.project_id) {
            return Err(ValidationError::UnknownProject(request.project_id.to_string()).into());
        }
        if request.points.len() < kind.min_points() {
            return Err(ValidationError::TooFewPoints {
                kind,
                required: kind.min_points(),
                found: request.points.len(),
            }
            .into());
        }

        let points = normalize_all(request.points, request.frame)?;
        let shape = AnnotationShape::from_points(kind, &points)?;
        let now = now_millis();
        let annotation = Annotation {
            id: uuid::Uuid::new_v4().to_string(),
            label_id: label.id.clone(),
            image_id: request.image_id.to_string(),
            project_id: request.project_id.to_string(),
            created_at: now,
            updated_at: now,
            notes: request.notes,
            shape,
        };

        self.store.insert(encode(&annotation)?).await?;
        log::info!(
            "Created {} annotation {} (label={}, image={})",
            kind,
            annotation.id,
            label.id,
            annotation.image_id
        );
        self.refresh_image_status(&annotation.image_id).await?;
        Ok(annotation)
    }

    /// Persist a modified annotation under its existing id.
    ///
    /// `created_at` is kept from the stored copy and `updated_at` always moves
    /// past the stored value.
    pub async fn update(&mut self, annotation: Annotation) -> Result<Annotation, ServiceError> {
        let previous = self.get(&annotation.id).await?;
        if !self.registry.label_exists(&annotation.label_id) {
            return Err(ValidationError::UnknownLabel(annotation.label_id).into());
        }

        let updated = Annotation {
            created_at: previous.created_at,
            updated_at: now_millis().max(previous.updated_at + 1),
            ..annotation
        };
        self.store.put(encode(&updated)?).await?;
        log::info!("Updated annotation {}", updated.id);

        self.refresh_image_status(&updated.image_id).await?;
        if previous.image_id != updated.image_id {
            self.refresh_image_status(&previous.image_id).await?;
        }
        Ok(updated)
    }

    /// Delete one annotation and recount its image.
    ///
    /// Returns whether a record was removed. `image_id` is recounted either
    /// way, and so is the image the record was actually stored under.
    pub async fn delete(&mut self, id: &str, image_id: &str) -> Result<bool, ServiceError> {
        let stored_image = self.store.get(id).await?.map(|r| r.image_id);
        let removed = self.store.delete(id).await?;
        if removed {
            log::info!("Deleted annotation {}", id);
        } else {
            log::debug!("Delete of unknown annotation {}", id);
        }
        self.refresh_image_status(image_id).await?;
        if let Some(owner) = stored_image.filter(|owner| owner != image_id && !owner.is_empty()) {
            self.refresh_image_status(&owner).await?;
        }
        Ok(removed)
    }

    /// Delete every record on an image, readable or not.
    pub async fn delete_by_image(&mut self, image_id: &str) -> Result<usize, ServiceError> {
        let ids: Vec<String> = self
            .store
            .scan(&RecordFilter::Image(image_id.to_string()))
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let removed = self.store.delete_ids(&ids).await?;
        log::info!("Deleted {} annotations from image {}", removed, image_id);
        self.refresh_image_status(image_id).await?;
        Ok(removed)
    }

    /// Fetch one annotation.
    pub async fn get(&self, id: &str) -> Result<Annotation, ServiceError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })?;
        decode(&record).map_err(|source| ServiceError::Corrupted {
            id: id.to_string(),
            source,
        })
    }

    /// Readable annotations on an image, oldest first.
    pub async fn list_by_image(&self, image_id: &str) -> Result<Vec<Annotation>, ServiceError> {
        self.list(RecordFilter::Image(image_id.to_string())).await
    }

    /// Readable annotations in a project, oldest first.
    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<Annotation>, ServiceError> {
        self.list(RecordFilter::Project(project_id.to_string())).await
    }

    /// Readable annotations using a label, oldest first.
    pub async fn list_by_label(&self, label_id: &str) -> Result<Vec<Annotation>, ServiceError> {
        self.list(RecordFilter::Label(label_id.to_string())).await
    }

    pub async fn count_by_image(&self, image_id: &str) -> Result<usize, ServiceError> {
        Ok(self.list_by_image(image_id).await?.len())
    }

    pub async fn count_by_project(&self, project_id: &str) -> Result<usize, ServiceError> {
        Ok(self.list_by_project(project_id).await?.len())
    }

    pub async fn count_by_label(&self, label_id: &str) -> Result<usize, ServiceError> {
        Ok(self.list_by_label(label_id).await?.len())
    }

    /// Annotation count per kind in a project. Every kind is present.
    pub async fn type_statistics(
        &self,
        project_id: &str,
    ) -> Result<BTreeMap<AnnotationKind, usize>, ServiceError> {
        let mut stats: BTreeMap<AnnotationKind, usize> =
            AnnotationKind::ALL.into_iter().map(|kind| (kind, 0)).collect();
        for annotation in self.list_by_project(project_id).await? {
            *stats.entry(annotation.kind()).or_insert(0) += 1;
        }
        Ok(stats)
    }

    /// Permanently delete unreadable records. Returns how many were removed.
    ///
    /// Pass one drops records with missing required fields at the storage
    /// level; pass two decodes everything left and drops what still fails.
    /// Running it on a clean store removes nothing.
    pub async fn repair_corrupted(&mut self) -> Result<usize, ServiceError> {
        let missing = self.store.delete_missing_required().await?;

        let records = self.store.scan(&RecordFilter::All).await?;
        let mut bad_ids = Vec::new();
        let mut touched_images = Vec::new();
        for record in &records {
            if let Err(e) = decode(record) {
                log::warn!("Removing corrupted annotation record '{}': {}", record.id, e);
                bad_ids.push(record.id.clone());
                if !touched_images.contains(&record.image_id) {
                    touched_images.push(record.image_id.clone());
                }
            }
        }
        let undecodable = if bad_ids.is_empty() {
            0
        } else {
            self.store.delete_ids(&bad_ids).await?
        };

        for image_id in &touched_images {
            self.refresh_image_status(image_id).await?;
        }

        let total = missing + undecodable;
        if total > 0 {
            log::info!(
                "Repair removed {} corrupted annotations ({} missing fields, {} undecodable)",
                total,
                missing,
                undecodable
            );
        } else {
            log::debug!("Repair found no corrupted annotations");
        }
        Ok(total)
    }

    /// Recount an image from the stored set and push the status to the image registry.
    pub async fn refresh_image_status(&self, image_id: &str) -> Result<usize, ServiceError> {
        let count = self.count_by_image(image_id).await?;
        self.registry.set_annotation_status(image_id, count > 0, count);
        log::debug!("Image {} now has {} annotations", image_id, count);
        Ok(count)
    }

    async fn list(&self, filter: RecordFilter) -> Result<Vec<Annotation>, ServiceError> {
        let records = self.store.scan(&filter).await?;
        Ok(decode_all(&records))
    }
}
