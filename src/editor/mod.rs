//! The annotation editor.
//!
//! [`Editor`] is the synchronous core a host UI drives. It owns the store,
//! the pointer state machine, undo history and save scheduling for the image
//! currently open, and never performs I/O: loads and saves leave the editor
//! as tickets and jobs and come back through [`Editor::finish_load`] and
//! [`Editor::finish_save`].
//!
//! Handlers are split by input source:
//! - `pointer`: press/move/release/capture and the context menu
//! - `keyboard`: shortcut dispatch
//! - `loading`: image lifecycle, loads and saves

mod keyboard;
mod loading;
mod pointer;


use std::collections::HashSet;

use web_time::Instant;

use crate::config::EditorSettings;
use crate::geometry::{CoordinateMapper, ScreenRect};
use crate::interaction::{CaptureDirective, Gesture, Guides};
use crate::keybindings::KeyBindings;
use crate::model::{
    Annotation, AnnotationId, BoundingBox, BoxAnnotation, EditorMode, IdGenerator, Point,
    ProjectConfig,
};
use crate::persistence::{LoadTracker, SaveScheduler, SaveStatus};
use crate::state::{AnnotationPatch, AnnotationSnapshot, AnnotationStore, Grouping};
use crate::undo::History;

pub use keyboard::{KeyResponse, Navigation};

/// Interaction engine for one image at a time.
#[derive(Debug)]
pub struct Editor {
    settings: EditorSettings,
    keybindings: KeyBindings,
    project: ProjectConfig,

    store: AnnotationStore,
    mapper: CoordinateMapper,
    history: History<AnnotationSnapshot>,
    ids: IdGenerator,

    mode: EditorMode,
    gesture: Gesture,
    /// Drawn box awaiting a class index.
    pending: Option<BoundingBox>,
    /// Pointer currently captured by a press.
    captured: Option<u64>,
    guides: Guides,
    expanded_groups: HashSet<AnnotationId>,

    image: Option<String>,
    saver: SaveScheduler,
    loads: LoadTracker,
    mounted: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        let mut saver = SaveScheduler::new().with_debounce_delay(settings.save_debounce());
        saver.set_enabled(settings.auto_save);
        Self {
            history: History::new(settings.history_limit),
            settings,
            keybindings: KeyBindings::default(),
            project: ProjectConfig::default(),
            store: AnnotationStore::new(),
            mapper: CoordinateMapper::new(),
            ids: IdGenerator::new(),
            mode: EditorMode::default(),
            gesture: Gesture::Idle,
            pending: None,
            captured: None,
            guides: Guides::default(),
            expanded_groups: HashSet::new(),
            image: None,
            saver,
            loads: LoadTracker::new(),
            mounted: false,
        }
    }

    pub fn with_keybindings(mut self, keybindings: KeyBindings) -> Self {
        self.keybindings = keybindings;
        self
    }

    pub fn with_project_config(mut self, project: ProjectConfig) -> Self {
        self.project = project;
        self
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    pub fn set_keybindings(&mut self, keybindings: KeyBindings) {
        self.keybindings = keybindings;
    }

    pub fn project_config(&self) -> &ProjectConfig {
        &self.project
    }

    /// Replace the class mapping, e.g. after the class manager saved it.
    pub fn set_project_config(&mut self, project: ProjectConfig) {
        self.project = project;
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.annotations()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.store.selected()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Image currently open, if any.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Whether the annotations of the current image have been loaded.
    pub fn is_loaded(&self) -> bool {
        self.saver.is_ready()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.saver.status()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.saver.is_dirty()
    }

    pub fn can_undo(&self) -> bool {
        !self.gesture.is_drag() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.gesture.is_drag() && self.history.can_redo()
    }

    pub fn grouping(&self) -> Grouping<'_> {
        self.store.grouping()
    }

    /// Drawn box waiting for the class prompt to be answered.
    pub fn pending_box(&self) -> Option<BoundingBox> {
        self.pending
    }

    /// Whether the host should be showing the class prompt.
    pub fn is_prompting(&self) -> bool {
        self.pending.is_some()
    }

    /// Live rectangle of the box being drawn.
    pub fn candidate_rect(&self) -> Option<BoundingBox> {
        self.gesture.candidate_rect()
    }

    /// Crosshair position in display space, when guides should be drawn.
    pub fn guides(&self) -> Option<Point> {
        if self.mode.is_drawing_mode() {
            self.guides.position()
        } else {
            None
        }
    }

    /// Keypoint index the next placed keypoint would get.
    pub fn next_keypoint_index(&self) -> u32 {
        self.store
            .selected_box()
            .map_or(0, |b| self.store.next_keypoint_index(b.id))
    }

    pub fn is_group_expanded(&self, box_id: AnnotationId) -> bool {
        self.expanded_groups.contains(&box_id)
    }

    pub fn toggle_group(&mut self, box_id: AnnotationId) {
        if !self.expanded_groups.remove(&box_id) {
            self.expanded_groups.insert(box_id);
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Record the image's intrinsic size once it has decoded.
    pub fn image_loaded(&mut self, natural_width: f64, natural_height: f64) {
        self.mapper.set_natural_size(natural_width, natural_height);
        log::debug!("Image decoded at {}x{}", natural_width, natural_height);
    }

    /// Record where the image is rendered. Call on every resize.
    pub fn set_rendered_rect(&mut self, rect: ScreenRect) {
        self.mapper.set_rendered_rect(rect);
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Switch interaction mode. Any gesture or pending box is abandoned.
    pub fn set_mode(&mut self, mode: EditorMode) -> CaptureDirective {
        let capture = self.cancel_gesture();
        self.pending = None;
        if self.mode != mode {
            log::debug!("Mode: {} -> {}", self.mode.name(), mode.name());
            self.mode = mode;
        }
        capture
    }

    /// Select an annotation from a list outside the canvas.
    pub fn select_from_list(&mut self, id: AnnotationId) -> CaptureDirective {
        let capture = self.set_mode(EditorMode::Select);
        self.select(Some(id));
        capture
    }

    pub(crate) fn select(&mut self, id: Option<AnnotationId>) {
        self.store.select(id);
        if let Some(b) = self.store.selected_box() {
            self.expanded_groups.insert(b.id);
        }
    }

    /// Restore the previous snapshot. Refused while dragging.
    pub fn undo(&mut self) -> bool {
        if self.gesture.is_drag() {
            log::debug!("Undo ignored during {}", self.gesture.name());
            return false;
        }
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.store.restore(snapshot);
        self.saver.mark_dirty(Instant::now());
        log::info!("Undo ({} annotations)", self.store.len());
        true
    }

    /// Re-apply an undone snapshot. Refused while dragging.
    pub fn redo(&mut self) -> bool {
        if self.gesture.is_drag() {
            log::debug!("Redo ignored during {}", self.gesture.name());
            return false;
        }
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.store.restore(snapshot);
        self.saver.mark_dirty(Instant::now());
        log::info!("Redo ({} annotations)", self.store.len());
        true
    }

    /// Delete the selected annotation.
    pub fn delete_selected(&mut self) -> bool {
        match self.store.selected() {
            Some(id) => self.delete(id),
            None => false,
        }
    }

    /// Delete an annotation; deleting a box also deletes its keypoints.
    pub fn delete(&mut self, id: AnnotationId) -> bool {
        if self.gesture.target() == Some(id) {
            self.gesture = Gesture::Idle;
        }
        let removed = self.store.remove(id);
        if removed.is_empty() {
            return false;
        }
        self.expanded_groups.remove(&id);
        log::info!("Deleted annotation {} ({} removed)", id, removed.len());
        self.commit();
        true
    }

    /// Turn the pending box into a stored box with a class.
    ///
    /// The label is `label` if non-empty, else the mapped class name. The
    /// new box is selected and the editor switches to keypoint placement.
    pub fn confirm_pending_box(
        &mut self,
        class_index: u32,
        label: Option<&str>,
    ) -> Option<AnnotationId> {
        let rect = self.pending.take()?;
        let mut bbox = BoxAnnotation::new(self.ids.next_id(), rect);
        bbox.class_index = Some(class_index);
        bbox.label = self.project.resolve_label(label, class_index);
        let id = bbox.id;
        log::info!(
            "Created bbox {} at ({:.1}, {:.1}) {:.1}x{:.1}, class {}",
            id,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            class_index
        );

        self.store.add(bbox.into());
        self.select(Some(id));
        self.mode = EditorMode::PlaceKeypoint;
        self.commit();
        Some(id)
    }

    /// Drop the pending box without storing it.
    pub fn cancel_pending_box(&mut self) -> bool {
        let had = self.pending.take().is_some();
        if had {
            log::debug!("Pending box cancelled");
        }
        had
    }

    /// Change the label of an annotation.
    pub fn set_label(&mut self, id: AnnotationId, label: impl Into<String>) -> bool {
        self.edit(id, AnnotationPatch::new().label(label))
    }

    /// Change the class of a box. `None` makes it unclassified.
    pub fn set_class_index(&mut self, id: AnnotationId, class_index: Option<u32>) -> bool {
        self.edit(id, AnnotationPatch::new().class_index(class_index))
    }

    pub fn set_keypoint_index(&mut self, id: AnnotationId, index: u32) -> bool {
        self.edit(id, AnnotationPatch::new().keypoint_index(index))
    }

    fn edit(&mut self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        if !self.store.update(id, patch) {
            return false;
        }
        log::debug!("Edited annotation {}", id);
        self.commit();
        true
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Snapshot the store into history and schedule a save.
    fn commit(&mut self) {
        self.history.commit(self.store.snapshot());
        self.saver.mark_dirty(Instant::now());
    }

    /// Abandon the active gesture. A move or resize is reverted to the
    /// geometry it started from.
    fn cancel_gesture(&mut self) -> CaptureDirective {
        match std::mem::take(&mut self.gesture) {
            Gesture::Moving { id, initial, .. } => {
                let patch = AnnotationPatch::new().position(initial.origin());
                self.store.update(id, patch);
                log::debug!("Move of {} cancelled", id);
            }
            Gesture::Resizing { id, initial, .. } => {
                self.store.update(id, AnnotationPatch::new().rect(initial));
                log::debug!("Resize of {} cancelled", id);
            }
            Gesture::Drawing { .. } => log::debug!("Drawing cancelled"),
            Gesture::Idle => {}
        }
        self.release_capture()
    }

    fn release_capture(&mut self) -> CaptureDirective {
        match self.captured.take() {
            Some(pointer_id) => CaptureDirective::Release(pointer_id),
            None => CaptureDirective::None,
        }
    }

    /// Threshold in natural pixels for a display-pixel setting.
    fn natural_threshold(&self, display_px: f64) -> f64 {
        self.mapper.display_to_natural_distance(display_px)
    }
}
