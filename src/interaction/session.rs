//! Interaction session for one image.
//!
//! Holds the current state, the image's annotations for hit testing and the
//! canvas extent, and forwards committed gestures to the service.

use super::machine::{Effect, Gesture, HitContext, InteractionEvent, InteractionState, transition};
use crate::config::AnnotatorConfig;
use crate::error::{ServiceError, ValidationError};
use crate::geometry::FrameSize;
use crate::hit_test::KEYPOINT_HIT_RADIUS;
use crate::model::{Annotation, AnnotationTool};
use crate::registry::LabelRegistry;
use crate::service::{AnnotationService, DrawRequest, Registries};
use crate::store::RecordStore;
use crate::supersede::{LatestRequest, RequestTicket};

/// Canvas session bound to one image.
#[derive(Debug)]
pub struct InteractionSession {
    image_id: String,
    project_id: String,
    frame: FrameSize,
    keypoint_radius: f64,
    state: InteractionState,
    annotations: Vec<Annotation>,
    reloads: LatestRequest,
}

impl InteractionSession {
    pub fn new(image_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            project_id: project_id.into(),
            frame: FrameSize::unknown(),
            keypoint_radius: KEYPOINT_HIT_RADIUS,
            state: InteractionState::Idle,
            annotations: Vec::new(),
            reloads: LatestRequest::new(),
        }
    }

    /// Set the keypoint hit radius in device pixels.
    pub fn with_keypoint_radius(mut self, radius: f64) -> Self {
        self.keypoint_radius = radius;
        self
    }

    /// Apply the configured interaction settings.
    pub fn with_config(self, config: &AnnotatorConfig) -> Self {
        self.with_keypoint_radius(config.keypoint_hit_radius)
    }

    /// Record the rendered canvas extent after layout or resize.
    pub fn set_frame(&mut self, frame: FrameSize) {
        self.frame = frame;
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Annotations currently shown, oldest first.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Feed an event to the state machine and return its effect.
    ///
    /// Commits are not executed here; use [`InteractionSession::commit`] or
    /// [`InteractionSession::pointer_up`] for that.
    pub fn handle(&mut self, event: InteractionEvent) -> Option<Effect> {
        let ctx = HitContext {
            annotations: &self.annotations,
            frame: self.frame,
            keypoint_radius: self.keypoint_radius,
        };
        let state = std::mem::take(&mut self.state);
        let next = transition(state, event, &ctx);
        self.state = next.state;
        next.effect
    }

    /// Shorthand for `handle(SelectTool(tool))`.
    pub fn select_tool(&mut self, tool: AnnotationTool) {
        self.handle(InteractionEvent::SelectTool(tool));
    }

    /// Finish the gesture and persist it if it is long enough.
    ///
    /// Returns `Ok(None)` when nothing was committed.
    pub async fn pointer_up<S: RecordStore, R: Registries>(
        &mut self,
        service: &mut AnnotationService<S, R>,
    ) -> Result<Option<Annotation>, ServiceError> {
        match self.handle(InteractionEvent::PointerUp) {
            Some(Effect::Commit(gesture)) => self.commit(service, gesture).await.map(Some),
            _ => Ok(None),
        }
    }

    /// Turn a committed gesture into a stored annotation.
    ///
    /// Without a selected label the gesture is dropped and
    /// `ValidationError::NoLabelSelected` is returned; the session carries on.
    pub async fn commit<S: RecordStore, R: Registries>(
        &mut self,
        service: &mut AnnotationService<S, R>,
        gesture: Gesture,
    ) -> Result<Annotation, ServiceError> {
        let Some(label) = service.registry().current_label() else {
            log::debug!("Dropping {} gesture: no label selected", gesture.kind);
            return Err(ValidationError::NoLabelSelected.into());
        };
        if !self.frame.is_laid_out() {
            return Err(ValidationError::EmptyFrame {
                width: self.frame.width,
                height: self.frame.height,
            }
            .into());
        }

        let request = DrawRequest {
            image_id: &self.image_id,
            project_id: &self.project_id,
            label: Some(&label),
            tool: gesture.kind.into(),
            points: &gesture.points,
            frame: self.frame,
            notes: None,
        };
        let annotation = service.create(request).await?;
        self.annotations.push(annotation.clone());
        Ok(annotation)
    }

    /// Delete the selected annotation, if any.
    pub async fn delete_selected<S: RecordStore, R: Registries>(
        &mut self,
        service: &mut AnnotationService<S, R>,
    ) -> Result<bool, ServiceError> {
        let Some(id) = self.state.selected().map(|a| a.id.clone()) else {
            return Ok(false);
        };
        let removed = service.delete(&id, &self.image_id).await?;
        self.annotations.retain(|a| a.id != id);
        self.handle(InteractionEvent::Cancel);
        Ok(removed)
    }

    /// Start reloading the annotation list; older reloads become stale.
    pub fn begin_reload(&self) -> RequestTicket {
        self.reloads.begin()
    }

    /// Install a reloaded list unless a newer reload was started since.
    pub fn finish_reload(&mut self, ticket: RequestTicket, annotations: Vec<Annotation>) -> bool {
        match self.reloads.accept(ticket, annotations) {
            Some(annotations) => {
                self.annotations = annotations;
                true
            }
            None => false,
        }
    }

    /// Reload this image's annotations from the service.
    pub async fn reload<S: RecordStore, R: Registries>(
        &mut self,
        service: &AnnotationService<S, R>,
    ) -> Result<bool, ServiceError> {
        let ticket = self.begin_reload();
        let annotations = service.list_by_image(&self.image_id).await?;
        Ok(self.finish_reload(ticket, annotations))
    }
}
