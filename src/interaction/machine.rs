//! Drawing and selection state machine.
//!
//! States are small immutable values replaced wholesale on every event.

use crate::geometry::{CanvasPoint, FrameSize};
use crate::hit_test::hit_test_with_radius;
use crate::model::{Annotation, AnnotationKind, AnnotationTool};

/// Where the canvas interaction currently stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    /// No tool chosen.
    #[default]
    Idle,
    /// Tool chosen, waiting for a gesture.
    ToolArmed(AnnotationKind),
    /// Gesture in progress; points are in canvas space.
    Drawing {
        kind: AnnotationKind,
        points: Vec<CanvasPoint>,
    },
    /// An existing annotation was picked. The armed tool, if any, is kept so
    /// toggling it still works.
    Selected {
        annotation: Annotation,
        tool: Option<AnnotationKind>,
    },
}

impl InteractionState {
    /// The tool currently armed, if any.
    pub fn tool(&self) -> Option<AnnotationKind> {
        match self {
            InteractionState::Idle => None,
            InteractionState::ToolArmed(kind) => Some(*kind),
            InteractionState::Drawing { kind, .. } => Some(*kind),
            InteractionState::Selected { tool, .. } => *tool,
        }
    }

    /// The selected annotation, if any.
    pub fn selected(&self) -> Option<&Annotation> {
        match self {
            InteractionState::Selected { annotation, .. } => Some(annotation),
            _ => None,
        }
    }

    /// Check if a gesture is in progress.
    pub fn is_drawing(&self) -> bool {
        matches!(self, InteractionState::Drawing { .. })
    }

    /// Get the preview shape for the current gesture.
    pub fn preview(&self) -> Option<Preview> {
        let InteractionState::Drawing { kind, points } = self else {
            return None;
        };
        match kind {
            AnnotationKind::BoundingBox => {
                let (first, last) = (points.first()?, points.last()?);
                Some(Preview::Rect {
                    min: CanvasPoint::new(first.x.min(last.x), first.y.min(last.y)),
                    max: CanvasPoint::new(first.x.max(last.x), first.y.max(last.y)),
                })
            }
            // Not closed while drawing
            AnnotationKind::Polygon => Some(Preview::Polyline(points.clone())),
            AnnotationKind::Keypoint => Some(Preview::Points(points.clone())),
        }
    }
}

/// In-progress shape for the renderer, in canvas space.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Rect { min: CanvasPoint, max: CanvasPoint },
    Polyline(Vec<CanvasPoint>),
    Points(Vec<CanvasPoint>),
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    SelectTool(AnnotationTool),
    PointerDown(CanvasPoint),
    PointerMove(CanvasPoint),
    PointerUp,
    /// Escape: drop the gesture and the selection.
    Cancel,
}

/// A finished gesture ready to become an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub kind: AnnotationKind,
    pub points: Vec<CanvasPoint>,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Build and persist an annotation from this gesture.
    Commit(Gesture),
    /// A gesture was thrown away.
    Discard { kind: AnnotationKind, points: usize },
}

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: InteractionState,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(state: InteractionState) -> Self {
        Self {
            state,
            effect: None,
        }
    }

    fn with_effect(state: InteractionState, effect: Effect) -> Self {
        Self {
            state,
            effect: Some(effect),
        }
    }
}

/// What a pointer-down is tested against.
#[derive(Debug, Clone, Copy)]
pub struct HitContext<'a> {
    /// Annotations on the image, oldest first
    pub annotations: &'a [Annotation],
    pub frame: FrameSize,
    pub keypoint_radius: f64,
}

/// Apply one event.
pub fn transition(
    state: InteractionState,
    event: InteractionEvent,
    ctx: &HitContext<'_>,
) -> Transition {
    let next = match event {
        InteractionEvent::SelectTool(tool) => select_tool(state, tool),
        InteractionEvent::PointerDown(p) => pointer_down(state, p, ctx),
        InteractionEvent::PointerMove(p) => Transition::to(pointer_move(state, p)),
        InteractionEvent::PointerUp => pointer_up(state),
        InteractionEvent::Cancel => cancel(state),
    };
    log::trace!("{:?} -> {:?}", event, next.state);
    next
}

fn discard_of(state: &InteractionState) -> Option<Effect> {
    match state {
        InteractionState::Drawing { kind, points } => Some(Effect::Discard {
            kind: *kind,
            points: points.len(),
        }),
        _ => None,
    }
}

fn select_tool(state: InteractionState, tool: AnnotationTool) -> Transition {
    let effect = discard_of(&state);
    let next = match tool.kind() {
        Some(kind) if state.tool() != Some(kind) => InteractionState::ToolArmed(kind),
        // Same tool again (or the "none" tool) toggles off
        _ => InteractionState::Idle,
    };
    log::debug!("Tool {} -> {:?}", tool.name(), next);
    Transition { state: next, effect }
}

fn pointer_down(state: InteractionState, p: CanvasPoint, ctx: &HitContext<'_>) -> Transition {
    if let Some(hit) = hit_test_with_radius(p, ctx.annotations, ctx.frame, ctx.keypoint_radius) {
        log::debug!("Selected annotation {}", hit.id);
        let effect = discard_of(&state);
        let next = InteractionState::Selected {
            annotation: hit.clone(),
            tool: state.tool(),
        };
        return Transition { state: next, effect };
    }
    match state {
        InteractionState::ToolArmed(kind) => Transition::to(InteractionState::Drawing {
            kind,
            points: vec![p],
        }),
        other => Transition::to(other),
    }
}

fn pointer_move(state: InteractionState, p: CanvasPoint) -> InteractionState {
    match state {
        InteractionState::Drawing { kind, points } => {
            let points = match kind {
                // Start corner pinned, end follows the pointer
                AnnotationKind::BoundingBox => vec![points.first().copied().unwrap_or(p), p],
                AnnotationKind::Polygon | AnnotationKind::Keypoint => {
                    let mut points = points;
                    points.push(p);
                    points
                }
            };
            InteractionState::Drawing { kind, points }
        }
        other => other,
    }
}

fn pointer_up(state: InteractionState) -> Transition {
    match state {
        InteractionState::Drawing { kind, points } => {
            let armed = InteractionState::ToolArmed(kind);
            if points.len() >= kind.min_points() {
                Transition::with_effect(armed, Effect::Commit(Gesture { kind, points }))
            } else {
                log::debug!(
                    "Discarding {} gesture with {} of {} points",
                    kind,
                    points.len(),
                    kind.min_points()
                );
                let count = points.len();
                Transition::with_effect(
                    armed,
                    Effect::Discard {
                        kind,
                        points: count,
                    },
                )
            }
        }
        other => Transition::to(other),
    }
}

fn cancel(state: InteractionState) -> Transition {
    let effect = discard_of(&state);
    let next = match state {
        InteractionState::Drawing { kind, .. } => InteractionState::ToolArmed(kind),
        InteractionState::Selected { tool, .. } => {
            tool.map_or(InteractionState::Idle, InteractionState::ToolArmed)
        }
        other => other,
    };
    Transition { state: next, effect }
}
