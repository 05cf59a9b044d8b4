//! Pointer input and the engine's response to it.

/// Mouse button or pen/touch equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// A pointer event in client (screen) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub button: PointerButton,
    /// Identifies the pointer for capture.
    pub pointer_id: u64,
}

impl PointerEvent {
    /// Primary-button event for the default pointer.
    pub fn primary(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x,
            client_y,
            button: PointerButton::Primary,
            pointer_id: 1,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_pointer_id(mut self, pointer_id: u64) -> Self {
        self.pointer_id = pointer_id;
        self
    }
}

/// What the host should do with pointer capture after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureDirective {
    #[default]
    None,
    /// Route all further events for this pointer to the editor.
    Acquire(u64),
    /// Stop capturing this pointer.
    Release(u64),
}

/// Result of feeding a pointer event to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerResponse {
    pub capture: CaptureDirective,
    /// Annotations, selection or transient drawing state changed; redraw.
    pub changed: bool,
    /// A pending box was created and the host should ask for its class.
    pub prompt_class: bool,
}

impl PointerResponse {
    /// Nothing happened.
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    pub fn acquire(mut self, pointer_id: u64) -> Self {
        self.capture = CaptureDirective::Acquire(pointer_id);
        self
    }

    pub fn with_prompt(mut self) -> Self {
        self.prompt_class = true;
        self.changed = true;
        self
    }
}
