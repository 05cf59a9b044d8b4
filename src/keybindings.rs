//! Keyboard shortcuts for the editor.
//!
//! Mode and navigation keys are configurable and persisted with the app
//! config. Undo/redo, delete and cancel use fixed keys.

use serde::{Deserialize, Serialize};

use crate::model::EditorMode;

/// Keys the editor understands. Hosts translate their native key events
/// into these, e.g. with [`KeyCode::from_key_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Delete,
    Backspace,
    Enter,
    Space,
    Tab,
}

impl KeyCode {
    /// Parse a DOM-style key name (`"v"`, `"ArrowLeft"`, `"Delete"`, ...).
    pub fn from_key_name(name: &str) -> Option<Self> {
        let key = match name {
            "ArrowLeft" => KeyCode::Left,
            "ArrowRight" => KeyCode::Right,
            "ArrowUp" => KeyCode::Up,
            "ArrowDown" => KeyCode::Down,
            "Escape" | "Esc" => KeyCode::Escape,
            "Delete" => KeyCode::Delete,
            "Backspace" => KeyCode::Backspace,
            "Enter" => KeyCode::Enter,
            " " | "Space" => KeyCode::Space,
            "Tab" => KeyCode::Tab,
            _ => {
                let mut chars = name.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Self::from_char(c)?
            }
        };
        Some(key)
    }

    fn from_char(c: char) -> Option<Self> {
        const LETTERS: [KeyCode; 26] = [
            KeyCode::A,
            KeyCode::B,
            KeyCode::C,
            KeyCode::D,
            KeyCode::E,
            KeyCode::F,
            KeyCode::G,
            KeyCode::H,
            KeyCode::I,
            KeyCode::J,
            KeyCode::K,
            KeyCode::L,
            KeyCode::M,
            KeyCode::N,
            KeyCode::O,
            KeyCode::P,
            KeyCode::Q,
            KeyCode::R,
            KeyCode::S,
            KeyCode::T,
            KeyCode::U,
            KeyCode::V,
            KeyCode::W,
            KeyCode::X,
            KeyCode::Y,
            KeyCode::Z,
        ];
        const DIGITS: [KeyCode; 10] = [
            KeyCode::Key0,
            KeyCode::Key1,
            KeyCode::Key2,
            KeyCode::Key3,
            KeyCode::Key4,
            KeyCode::Key5,
            KeyCode::Key6,
            KeyCode::Key7,
            KeyCode::Key8,
            KeyCode::Key9,
        ];
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() {
            LETTERS.get(usize::from(c as u8 - b'A')).copied()
        } else if c.is_ascii_digit() {
            DIGITS.get(usize::from(c as u8 - b'0')).copied()
        } else {
            None
        }
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
        meta: false,
    };

    pub const CTRL_SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: true,
        alt: false,
        meta: false,
    };

    /// Ctrl, or Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
    /// A text field has focus; shortcuts must not fire.
    pub text_input_focused: bool,
}

impl KeyEvent {
    pub fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            text_input_focused: false,
        }
    }

    /// Unmodified key press.
    pub fn plain(key: KeyCode) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    pub fn in_text_input(mut self) -> Self {
        self.text_input_focused = true;
        self
    }
}

/// What a key press asks the editor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    SetMode(EditorMode),
    Undo,
    Redo,
    DeleteSelected,
    Cancel,
    NextImage,
    PreviousImage,
}

/// Keybinding configuration for the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Hotkey for Select mode
    pub mode_select: KeyCode,
    /// Hotkey for box drawing mode
    pub mode_draw_box: KeyCode,
    /// Hotkey for keypoint placement mode
    pub mode_keypoint: KeyCode,

    /// Keys that go to the next image
    pub next_image: Vec<KeyCode>,
    /// Keys that go to the previous image
    pub previous_image: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            mode_select: KeyCode::V,
            mode_draw_box: KeyCode::B,
            mode_keypoint: KeyCode::K,
            next_image: vec![KeyCode::D, KeyCode::Right],
            previous_image: vec![KeyCode::A, KeyCode::Left],
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mode that corresponds to a key press, if any.
    pub fn mode_for_key(&self, key: KeyCode) -> Option<EditorMode> {
        if key == self.mode_select {
            Some(EditorMode::Select)
        } else if key == self.mode_draw_box {
            Some(EditorMode::DrawBox)
        } else if key == self.mode_keypoint {
            Some(EditorMode::PlaceKeypoint)
        } else {
            None
        }
    }

    /// Get the hotkey for a specific mode.
    pub fn key_for_mode(&self, mode: EditorMode) -> KeyCode {
        match mode {
            EditorMode::Select => self.mode_select,
            EditorMode::DrawBox => self.mode_draw_box,
            EditorMode::PlaceKeypoint => self.mode_keypoint,
        }
    }

    /// Set the hotkey for a mode.
    pub fn set_mode_key(&mut self, mode: EditorMode, key: KeyCode) {
        match mode {
            EditorMode::Select => self.mode_select = key,
            EditorMode::DrawBox => self.mode_draw_box = key,
            EditorMode::PlaceKeypoint => self.mode_keypoint = key,
        }
    }

    /// Resolve a key press to an editor action.
    ///
    /// Returns `None` while a text input has focus.
    pub fn action_for(&self, event: &KeyEvent) -> Option<EditorAction> {
        if event.text_input_focused {
            return None;
        }
        let modifiers = event.modifiers;

        // Ctrl+key shortcuts
        if modifiers.command() {
            return match event.key {
                KeyCode::Z if modifiers.shift => Some(EditorAction::Redo),
                KeyCode::Z => Some(EditorAction::Undo),
                KeyCode::Y => Some(EditorAction::Redo),
                _ => None,
            };
        }
        if modifiers.alt {
            return None;
        }

        match event.key {
            KeyCode::Escape => return Some(EditorAction::Cancel),
            KeyCode::Delete | KeyCode::Backspace => return Some(EditorAction::DeleteSelected),
            _ => {}
        }

        if let Some(mode) = self.mode_for_key(event.key) {
            return Some(EditorAction::SetMode(mode));
        }
        if self.next_image.contains(&event.key) {
            return Some(EditorAction::NextImage);
        }
        if self.previous_image.contains(&event.key) {
            return Some(EditorAction::PreviousImage);
        }
        None
    }

    /// Check if a key is already used by any binding.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, key: KeyCode, exclude_mode: Option<EditorMode>) -> Option<String> {
        for &mode in EditorMode::all() {
            if exclude_mode != Some(mode) && key == self.key_for_mode(mode) {
                return Some(format!("{} mode", mode.name()));
            }
        }
        if self.next_image.contains(&key) {
            return Some("Next image".to_string());
        }
        if self.previous_image.contains(&key) {
            return Some("Previous image".to_string());
        }
        None
    }
}

/// Convert a KeyCode to a display string, e.g. for toolbar tooltips.
pub fn key_to_string(key: KeyCode) -> &'static str {
    match key {
        KeyCode::A => "A",
        KeyCode::B => "B",
        KeyCode::C => "C",
        KeyCode::D => "D",
        KeyCode::E => "E",
        KeyCode::F => "F",
        KeyCode::G => "G",
        KeyCode::H => "H",
        KeyCode::I => "I",
        KeyCode::J => "J",
        KeyCode::K => "K",
        KeyCode::L => "L",
        KeyCode::M => "M",
        KeyCode::N => "N",
        KeyCode::O => "O",
        KeyCode::P => "P",
        KeyCode::Q => "Q",
        KeyCode::R => "R",
        KeyCode::S => "S",
        KeyCode::T => "T",
        KeyCode::U => "U",
        KeyCode::V => "V",
        KeyCode::W => "W",
        KeyCode::X => "X",
        KeyCode::Y => "Y",
        KeyCode::Z => "Z",
        KeyCode::Key0 => "0",
        KeyCode::Key1 => "1",
        KeyCode::Key2 => "2",
        KeyCode::Key3 => "3",
        KeyCode::Key4 => "4",
        KeyCode::Key5 => "5",
        KeyCode::Key6 => "6",
        KeyCode::Key7 => "7",
        KeyCode::Key8 => "8",
        KeyCode::Key9 => "9",
        KeyCode::Left => "←",
        KeyCode::Right => "→",
        KeyCode::Up => "↑",
        KeyCode::Down => "↓",
        KeyCode::Escape => "Esc",
        KeyCode::Delete => "Del",
        KeyCode::Backspace => "Backspace",
        KeyCode::Enter => "Enter",
        KeyCode::Space => "Space",
        KeyCode::Tab => "Tab",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_keys() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.mode_for_key(KeyCode::V), Some(EditorMode::Select));
        assert_eq!(bindings.mode_for_key(KeyCode::B), Some(EditorMode::DrawBox));
        assert_eq!(bindings.mode_for_key(KeyCode::K), Some(EditorMode::PlaceKeypoint));
        assert_eq!(bindings.mode_for_key(KeyCode::Q), None);
    }

    #[test]
    fn test_undo_redo_shortcuts() {
        let bindings = KeyBindings::default();
        let undo = KeyEvent::new(KeyCode::Z, Modifiers::CTRL);
        let redo = KeyEvent::new(KeyCode::Z, Modifiers::CTRL_SHIFT);
        let redo_y = KeyEvent::new(KeyCode::Y, Modifiers::CTRL);
        assert_eq!(bindings.action_for(&undo), Some(EditorAction::Undo));
        assert_eq!(bindings.action_for(&redo), Some(EditorAction::Redo));
        assert_eq!(bindings.action_for(&redo_y), Some(EditorAction::Redo));

        let cmd_z = KeyEvent::new(
            KeyCode::Z,
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            },
        );
        assert_eq!(bindings.action_for(&cmd_z), Some(EditorAction::Undo));
    }

    #[test]
    fn test_ctrl_does_not_trigger_mode_keys() {
        let bindings = KeyBindings::default();
        let ctrl_v = KeyEvent::new(KeyCode::V, Modifiers::CTRL);
        assert_eq!(bindings.action_for(&ctrl_v), None);
    }

    #[test]
    fn test_navigation_and_editing_keys() {
        let bindings = KeyBindings::default();
        for key in [KeyCode::D, KeyCode::Right] {
            assert_eq!(bindings.action_for(&KeyEvent::plain(key)), Some(EditorAction::NextImage));
        }
        for key in [KeyCode::A, KeyCode::Left] {
            assert_eq!(
                bindings.action_for(&KeyEvent::plain(key)),
                Some(EditorAction::PreviousImage)
            );
        }
        assert_eq!(
            bindings.action_for(&KeyEvent::plain(KeyCode::Backspace)),
            Some(EditorAction::DeleteSelected)
        );
        assert_eq!(
            bindings.action_for(&KeyEvent::plain(KeyCode::Escape)),
            Some(EditorAction::Cancel)
        );
    }

    #[test]
    fn test_text_input_suppresses_shortcuts() {
        let bindings = KeyBindings::default();
        let event = KeyEvent::plain(KeyCode::Delete).in_text_input();
        assert_eq!(bindings.action_for(&event), None);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(KeyCode::from_key_name("v"), Some(KeyCode::V));
        assert_eq!(KeyCode::from_key_name("K"), Some(KeyCode::K));
        assert_eq!(KeyCode::from_key_name("7"), Some(KeyCode::Key7));
        assert_eq!(KeyCode::from_key_name("ArrowRight"), Some(KeyCode::Right));
        assert_eq!(KeyCode::from_key_name("Shift"), None);
        assert_eq!(KeyCode::from_key_name("é"), None);
    }

    #[test]
    fn test_key_conflict() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.key_conflict(KeyCode::V, None), Some("Select mode".to_string()));
        assert_eq!(bindings.key_conflict(KeyCode::V, Some(EditorMode::Select)), None);
        assert_eq!(bindings.key_conflict(KeyCode::D, None), Some("Next image".to_string()));
    }

    #[test]
    fn test_serde_round_trip_partial() {
        let bindings: KeyBindings = serde_json::from_str(r#"{"mode_select":"S"}"#).unwrap();
        assert_eq!(bindings.mode_select, KeyCode::S);
        assert_eq!(bindings.mode_draw_box, KeyCode::B);
    }
}
