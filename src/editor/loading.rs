//! Image lifecycle: opening, loading, saving, mount and teardown.

use web_time::Instant;

use super::Editor;
use crate::interaction::{CaptureDirective, Gesture};
use crate::model::{Annotation, EditorMode};
use crate::persistence::{BackendResult, LoadTicket, SaveJob, SaveTicket};

impl Editor {
    /// Activate keyboard handling.
    pub fn mount(&mut self) {
        self.mounted = true;
        log::debug!("Editor mounted");
    }

    /// Deactivate the editor: keys stop working, the active gesture is
    /// abandoned and any in-flight load becomes stale.
    pub fn teardown(&mut self) -> CaptureDirective {
        self.mounted = false;
        self.pending = None;
        self.guides.hide();
        self.loads.invalidate();
        log::debug!("Editor torn down");
        self.cancel_gesture()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Switch to another image and start loading its annotations.
    ///
    /// Everything tied to the previous image is dropped: annotations,
    /// selection, history, pending changes and natural size. The mode
    /// returns to box drawing. Until [`Editor::finish_load`] accepts the
    /// returned ticket the editor shows an empty, read-only store.
    pub fn open_image(&mut self, image: impl Into<String>) -> LoadTicket {
        let image = image.into();
        log::info!("Opening image '{}'", image);

        self.gesture = Gesture::Idle;
        self.captured = None;
        self.pending = None;
        self.store.replace_all(None);
        self.history.reset(self.store.snapshot());
        self.saver.reset();
        self.mapper.clear_image();
        self.expanded_groups.clear();
        self.guides.hide();
        self.mode = EditorMode::DrawBox;

        let ticket = self.loads.begin(image.as_str());
        self.image = Some(image);
        ticket
    }

    /// Apply a load result. Returns `false` and changes nothing if the
    /// ticket is stale.
    ///
    /// A failed load leaves the store empty but usable.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        result: BackendResult<Option<Vec<Annotation>>>,
    ) -> bool {
        if !self.loads.finish(ticket) {
            log::debug!("Discarding stale load of '{}'", ticket.image());
            return false;
        }

        match result {
            Ok(annotations) => {
                self.store.replace_all(annotations);
                log::info!(
                    "Loaded {} annotations for '{}'",
                    self.store.len(),
                    ticket.image()
                );
            }
            Err(e) => {
                log::warn!("Failed to load annotations for '{}': {}", ticket.image(), e);
                self.store.replace_all(None);
            }
        }

        if let Some(max) = self.store.max_id() {
            self.ids.observe(max);
        }
        self.history.reset(self.store.snapshot());
        self.saver.set_ready(true);
        true
    }

    /// Hand out a save if the debounce has expired and none is in flight.
    pub fn poll_save(&mut self, now: Instant) -> Option<SaveJob> {
        self.issue_save(now, false)
    }

    /// Hand out a save right away, e.g. before navigating. Returns `None`
    /// unless loaded annotations have unsaved changes and no save is in flight.
    pub fn flush_save(&mut self, now: Instant) -> Option<SaveJob> {
        self.issue_save(now, true)
    }

    fn issue_save(&mut self, now: Instant, force: bool) -> Option<SaveJob> {
        let image = self.image.clone()?;
        let ticket = self.saver.begin(now, force)?;
        log::debug!("Saving {} annotations for '{}'", self.store.len(), image);
        Some(SaveJob {
            image,
            annotations: self.store.annotations().to_vec(),
            ticket,
        })
    }

    /// Time until the next auto-save is due, if one is pending.
    pub fn time_until_save(&self, now: Instant) -> Option<std::time::Duration> {
        self.saver.time_until_due(now)
    }

    /// Report the outcome of a save job.
    pub fn finish_save(&mut self, ticket: SaveTicket, result: BackendResult<()>) {
        let success = match &result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save annotations: {}", e);
                false
            }
        };
        if self.saver.finish(ticket, success) && success {
            log::debug!("Annotations saved");
        }
    }
}
