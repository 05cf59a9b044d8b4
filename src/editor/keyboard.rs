//! Keyboard shortcut dispatch.

use super::Editor;
use crate::interaction::CaptureDirective;
use crate::keybindings::{EditorAction, KeyEvent};

/// Direction of an image change requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
}

/// Result of feeding a key press to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyResponse {
    /// The key was bound and consumed.
    pub handled: bool,
    pub capture: CaptureDirective,
    /// The host should save and move to another image.
    pub navigate: Option<Navigation>,
}

impl KeyResponse {
    fn handled() -> Self {
        Self {
            handled: true,
            ..Self::default()
        }
    }
}

impl Editor {
    /// Dispatch a key press through the keybindings.
    ///
    /// Keys are ignored before [`Editor::mount`], after [`Editor::teardown`],
    /// while a text input has focus and while the class prompt is open.
    pub fn handle_key(&mut self, event: KeyEvent) -> KeyResponse {
        if !self.mounted || self.pending.is_some() {
            return KeyResponse::default();
        }
        let Some(action) = self.keybindings.action_for(&event) else {
            return KeyResponse::default();
        };
        log::debug!("Key {:?} -> {:?}", event.key, action);

        let mut response = KeyResponse::handled();
        match action {
            EditorAction::SetMode(mode) => response.capture = self.set_mode(mode),
            EditorAction::Undo => {
                self.undo();
            }
            EditorAction::Redo => {
                self.redo();
            }
            EditorAction::DeleteSelected => {
                self.delete_selected();
            }
            EditorAction::Cancel => response.capture = self.cancel(),
            EditorAction::NextImage => response.navigate = Some(Navigation::Next),
            EditorAction::PreviousImage => response.navigate = Some(Navigation::Previous),
        }
        response
    }

    /// Escape: abandon the pending box, else the active gesture, else the
    /// selection.
    pub fn cancel(&mut self) -> CaptureDirective {
        if self.cancel_pending_box() {
            return CaptureDirective::None;
        }
        if !self.gesture.is_idle() {
            return self.cancel_gesture();
        }
        self.select(None);
        CaptureDirective::None
    }
}
