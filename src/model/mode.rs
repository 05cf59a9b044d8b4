//! Editor interaction modes.

use serde::{Deserialize, Serialize};

/// Pointer interaction mode of the editor. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorMode {
    /// Select, move and resize existing annotations
    Select,
    /// Drag out new bounding boxes
    #[default]
    DrawBox,
    /// Place keypoints with a single press
    PlaceKeypoint,
}

impl EditorMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            EditorMode::Select => "Select",
            EditorMode::DrawBox => "Bounding Box",
            EditorMode::PlaceKeypoint => "Keypoint",
        }
    }

    /// Get all modes in toolbar order.
    pub fn all() -> &'static [EditorMode] {
        &[
            EditorMode::Select,
            EditorMode::DrawBox,
            EditorMode::PlaceKeypoint,
        ]
    }

    /// Check if this mode creates annotations (not Select).
    pub fn is_drawing_mode(&self) -> bool {
        !matches!(self, EditorMode::Select)
    }
}
