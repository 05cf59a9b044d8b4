//! Pointer interaction types.
//!
//! The state machine itself runs inside [`crate::editor::Editor`]; this
//! module holds the gesture states, the resize/move math and the pointer
//! input/output types it works with.

mod gesture;
mod guides;
mod pointer;

pub use gesture::{Gesture, Handle, move_box, move_point, resize_box};
pub use guides::Guides;
pub use pointer::{CaptureDirective, PointerButton, PointerEvent, PointerResponse};
