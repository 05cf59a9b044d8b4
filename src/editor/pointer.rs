//! Pointer handling: the gesture state machine.

use super::Editor;
use crate::interaction::{
    Gesture, Handle, PointerButton, PointerEvent, PointerResponse, move_box, move_point,
    resize_box,
};
use crate::model::{Annotation, AnnotationId, BoundingBox, EditorMode, KeypointAnnotation, Point};
use crate::state::AnnotationPatch;

impl Editor {
    /// Handle a button press over the canvas.
    ///
    /// Presses are ignored until the image and its annotations are loaded,
    /// while the class prompt is open, outside the rendered image, and while
    /// another gesture is running.
    pub fn pointer_down(&mut self, event: PointerEvent) -> PointerResponse {
        if event.button != PointerButton::Primary {
            return PointerResponse::ignored();
        }
        if self.pending.is_some() || !self.is_loaded() || !self.gesture.is_idle() {
            return PointerResponse::ignored();
        }
        if !self.mapper.contains_client(event.client_x, event.client_y) {
            return PointerResponse::ignored();
        }
        let Some(pos) = self.mapper.to_natural(event.client_x, event.client_y) else {
            return PointerResponse::ignored();
        };

        self.captured = Some(event.pointer_id);
        let response = PointerResponse::changed().acquire(event.pointer_id);

        match self.mode {
            EditorMode::Select => self.press_select(pos),
            EditorMode::DrawBox => {
                self.select(None);
                self.gesture = Gesture::Drawing {
                    anchor: pos,
                    current: pos,
                };
                log::trace!("Drawing from ({:.1}, {:.1})", pos.x, pos.y);
            }
            EditorMode::PlaceKeypoint => self.place_keypoint(pos),
        }
        response
    }

    fn press_select(&mut self, pos: Point) {
        if let Some((id, rect)) = self.store.selected_box().map(|b| (b.id, b.rect())) {
            let radius = self.natural_threshold(self.settings.handle_hit_radius_px);
            if let Some(handle) = Handle::hit(&rect, &pos, radius) {
                log::debug!("Resizing box {} from {:?}", id, handle);
                self.gesture = Gesture::Resizing {
                    id,
                    handle,
                    start: pos,
                    initial: rect,
                };
                return;
            }
        }

        let radius = self.natural_threshold(self.settings.keypoint_hit_radius_px);
        let hit = self
            .store
            .hit_test(&pos, radius)
            .and_then(|id| self.store.get(id).cloned());
        match hit {
            Some(initial) => {
                let id = initial.id();
                self.select(Some(id));
                log::debug!("Moving {} {}", initial.kind(), id);
                self.gesture = Gesture::Moving {
                    id,
                    start: pos,
                    initial,
                };
            }
            None => {
                log::debug!("No annotation at click position, deselected");
                self.select(None);
            }
        }
    }

    fn place_keypoint(&mut self, pos: Point) {
        let parent = self.store.selected_box().map(|b| b.id);
        let index = self.next_keypoint_index();
        let mut keypoint = KeypointAnnotation::new(self.ids.next_id(), pos, index);
        keypoint.label = self.settings.keypoint_label.clone();
        keypoint.parent_id = parent;
        log::info!(
            "Created keypoint {} at ({:.1}, {:.1}), index {}, parent {:?}",
            keypoint.id,
            pos.x,
            pos.y,
            index,
            parent
        );
        self.store.add(keypoint.into());
        self.commit();
    }

    /// Handle pointer motion. Updates guides and the active gesture.
    pub fn pointer_move(&mut self, event: PointerEvent) -> PointerResponse {
        let mut response = PointerResponse::ignored();

        if let (Some(display), Some(rendered)) = (
            self.mapper.to_display(event.client_x, event.client_y),
            self.mapper.display_size(),
        ) {
            self.guides.track(display, rendered);
            response.changed = self.mode.is_drawing_mode();
        }

        if self.captured.is_some_and(|id| id != event.pointer_id) {
            return response;
        }
        let Some(pos) = self.mapper.to_natural(event.client_x, event.client_y) else {
            return response;
        };

        if let Gesture::Drawing { current, .. } = &mut self.gesture {
            *current = pos;
            return PointerResponse::changed();
        }

        if let Some((id, patch)) = self.drag_patch(pos) {
            log::trace!("Drag {} to ({:.1}, {:.1})", id, pos.x, pos.y);
            self.store.update(id, patch);
            response.changed = true;
        }
        response
    }

    /// Geometry update for the running move or resize.
    fn drag_patch(&self, pos: Point) -> Option<(AnnotationId, AnnotationPatch)> {
        let bounds = self.mapper.natural_size()?;
        match &self.gesture {
            Gesture::Moving { id, start, initial } => {
                let (dx, dy) = (pos.x - start.x, pos.y - start.y);
                let patch = match initial {
                    Annotation::Box(b) => AnnotationPatch::new().rect(move_box(&b.rect(), dx, dy, bounds)),
                    Annotation::Keypoint(k) => {
                        AnnotationPatch::new().position(move_point(k.position(), dx, dy, bounds))
                    }
                };
                Some((*id, patch))
            }
            Gesture::Resizing {
                id,
                handle,
                start,
                initial,
            } => {
                let (dx, dy) = (pos.x - start.x, pos.y - start.y);
                let rect = resize_box(initial, *handle, dx, dy, bounds);
                Some((*id, AnnotationPatch::new().rect(rect)))
            }
            Gesture::Idle | Gesture::Drawing { .. } => None,
        }
    }

    /// Handle a button release, ending the active gesture.
    ///
    /// A finished drawing becomes a pending box if it is larger than the
    /// minimum size in both dimensions; the response then asks the host to
    /// prompt for a class.
    pub fn pointer_up(&mut self, event: PointerEvent) -> PointerResponse {
        if event.button != PointerButton::Primary {
            return PointerResponse::ignored();
        }
        if self.captured.is_some_and(|id| id != event.pointer_id) {
            return PointerResponse::ignored();
        }
        let release = self.release_capture();
        let mut response = PointerResponse::ignored();
        response.capture = release;

        match std::mem::take(&mut self.gesture) {
            Gesture::Drawing { anchor, current } => {
                let end = self
                    .mapper
                    .to_natural(event.client_x, event.client_y)
                    .unwrap_or(current);
                response.changed = true;
                if self.finish_drawing(BoundingBox::from_corners(anchor, end)) {
                    response = response.with_prompt();
                }
            }
            gesture @ (Gesture::Moving { .. } | Gesture::Resizing { .. }) => {
                response.changed = self.finish_drag(&gesture);
            }
            Gesture::Idle => {}
        }
        response
    }

    fn finish_drawing(&mut self, rect: BoundingBox) -> bool {
        let min = self.natural_threshold(self.settings.min_box_size_px);
        if rect.width > min && rect.height > min {
            log::debug!(
                "Pending box ({:.1}, {:.1}) {:.1}x{:.1}",
                rect.x,
                rect.y,
                rect.width,
                rect.height
            );
            self.pending = Some(rect);
            true
        } else {
            log::debug!(
                "Discarded box {:.1}x{:.1} below minimum {:.1}",
                rect.width,
                rect.height,
                min
            );
            false
        }
    }

    /// Commit a finished move or resize if it changed anything.
    fn finish_drag(&mut self, gesture: &Gesture) -> bool {
        let changed = match gesture {
            Gesture::Moving { id, initial, .. } => self.store.get(*id).is_some_and(|a| a != initial),
            Gesture::Resizing { id, initial, .. } => self
                .store
                .get(*id)
                .and_then(Annotation::as_box)
                .is_some_and(|b| b.rect() != *initial),
            Gesture::Idle | Gesture::Drawing { .. } => false,
        };
        if changed {
            if let Some(id) = gesture.target() {
                log::info!("Finished {} of annotation {}", gesture.name(), id);
            }
            self.commit();
        }
        changed
    }

    /// The host lost pointer capture (e.g. the window lost focus).
    ///
    /// Any gesture ends: a move or resize is kept as-is, a drawing is
    /// dropped.
    pub fn pointer_capture_lost(&mut self, pointer_id: u64) -> PointerResponse {
        if self.captured.is_some_and(|id| id != pointer_id) {
            return PointerResponse::ignored();
        }
        self.captured = None;
        let mut response = PointerResponse::ignored();
        match std::mem::take(&mut self.gesture) {
            Gesture::Drawing { .. } => {
                log::debug!("Capture lost, drawing dropped");
                response.changed = true;
            }
            gesture @ (Gesture::Moving { .. } | Gesture::Resizing { .. }) => {
                log::debug!("Capture lost during {}", gesture.name());
                self.finish_drag(&gesture);
                response.changed = true;
            }
            Gesture::Idle => {}
        }
        response
    }

    /// The pointer left the canvas; hide the guides.
    pub fn pointer_leave(&mut self) -> PointerResponse {
        self.guides.hide();
        PointerResponse {
            changed: self.mode.is_drawing_mode(),
            ..PointerResponse::default()
        }
    }

    /// Secondary click: cancel a drawing, else fall back to select mode,
    /// else clear the selection. A pending box is dropped in every case.
    pub fn context_menu(&mut self) -> PointerResponse {
        self.pending = None;
        let capture = if self.gesture.is_drawing() {
            self.cancel_gesture()
        } else if self.mode != EditorMode::Select {
            self.set_mode(EditorMode::Select)
        } else {
            let capture = self.cancel_gesture();
            self.select(None);
            capture
        };
        PointerResponse {
            capture,
            changed: true,
            prompt_class: false,
        }
    }

    /// Whether the given pointer is captured by the editor.
    pub fn has_capture(&self, pointer_id: u64) -> bool {
        self.captured == Some(pointer_id)
    }
}
