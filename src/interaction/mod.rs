//! Canvas interaction: tool selection, gesture capture, selection.
//!
//! `machine` is a pure `(state, event) -> state` function with no rendering
//! dependency. `session` drives it for one image and hands committed
//! gestures to the annotation service.

mod machine;
mod session;

pub use machine::{
    Effect, Gesture, HitContext, InteractionEvent, InteractionState, Preview, Transition,
    transition,
};
pub use session::InteractionSession;
