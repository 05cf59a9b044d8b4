//! Debounced auto-save scheduling.
//!
//! The scheduler never performs I/O itself. The editor asks it whether a
//! save is due, hands the resulting [`SaveJob`] to whoever talks to the
//! backend, and reports the outcome back with the job's ticket.

use std::time::Duration;

use web_time::Instant;

use crate::constants::SAVE_DEBOUNCE;
use crate::model::Annotation;

/// Result of the most recent save, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Saved,
    Saving,
    Error,
}

impl SaveStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SaveStatus::Saved => "saved",
            SaveStatus::Saving => "saving",
            SaveStatus::Error => "error",
        }
    }
}

/// Identifies one issued save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveTicket(u64);

/// A save the host must send to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveJob {
    pub image: String,
    pub annotations: Vec<Annotation>,
    pub ticket: SaveTicket,
}

/// Manages debounced saving of annotations.
///
/// - **Debounce delay**: every change restarts the delay, so a burst of
///   edits produces a single save.
/// - **Single flight**: no save is issued while another is outstanding.
///   Changes made meanwhile keep the scheduler dirty and are picked up by
///   the next save.
/// - **Readiness**: nothing is scheduled until the current image's
///   annotations have been loaded.
#[derive(Debug)]
pub struct SaveScheduler {
    /// Debounce delay (wait this long after last change before saving).
    debounce_delay: Duration,

    /// Time of last change that needs saving.
    last_change: Option<Instant>,

    /// Whether there are unsaved changes.
    dirty: bool,

    /// Whether the store holds loaded annotations.
    ready: bool,

    /// Whether auto-save is enabled.
    enabled: bool,

    in_flight: Option<SaveTicket>,
    /// In-flight save issued for a previous image.
    detached: Option<SaveTicket>,
    next_ticket: u64,
    status: SaveStatus,
}

impl SaveScheduler {
    /// Create a new scheduler with the default debounce delay.
    pub fn new() -> Self {
        Self {
            debounce_delay: SAVE_DEBOUNCE,
            last_change: None,
            dirty: false,
            ready: false,
            enabled: true,
            in_flight: None,
            detached: None,
            next_ticket: 0,
            status: SaveStatus::Saved,
        }
    }

    /// Create a disabled scheduler. Forced saves still work.
    pub fn disabled() -> Self {
        let mut scheduler = Self::new();
        scheduler.enabled = false;
        scheduler
    }

    /// Set the debounce delay.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn debounce_delay(&self) -> Duration {
        self.debounce_delay
    }

    /// Set whether auto-save is enabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mark the store as loaded (or not). Changes before this are ignored.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Mark that a change occurred that needs saving.
    pub fn mark_dirty(&mut self, now: Instant) {
        if !self.ready {
            log::trace!("Auto-save: change before load ignored");
            return;
        }
        self.dirty = true;
        self.last_change = Some(now);
        log::trace!("Auto-save: marked dirty");
    }

    /// Check if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn in_flight(&self) -> Option<SaveTicket> {
        self.in_flight
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Check if we should save now.
    ///
    /// Returns true if:
    /// - Auto-save is enabled and the store is loaded
    /// - There are unsaved changes
    /// - The debounce delay has passed since the last change
    /// - No other save is in flight
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.enabled || !self.ready || !self.dirty || self.in_flight.is_some() {
            return false;
        }
        let Some(last_change) = self.last_change else {
            return false;
        };
        now.saturating_duration_since(last_change) >= self.debounce_delay
    }

    /// Time left until the pending change becomes due, `Some(ZERO)` if it
    /// is due now, `None` if nothing is pending.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if !self.enabled || !self.ready || !self.dirty {
            return None;
        }
        let last_change = self.last_change?;
        let elapsed = now.saturating_duration_since(last_change);
        Some(self.debounce_delay.saturating_sub(elapsed))
    }

    /// Issue a ticket for a save that starts now.
    ///
    /// Returns `None` while another save is in flight or when nothing has
    /// changed since the last save. With `force` the debounce and the
    /// enabled flag are skipped.
    pub fn begin(&mut self, now: Instant, force: bool) -> Option<SaveTicket> {
        if self.in_flight.is_some() {
            log::debug!("Auto-save: save already in flight");
            return None;
        }
        if !self.ready || !self.dirty {
            return None;
        }
        if !force && !self.should_save(now) {
            return None;
        }
        self.next_ticket += 1;
        let ticket = SaveTicket(self.next_ticket);
        self.in_flight = Some(ticket);
        self.dirty = false;
        self.last_change = None;
        self.status = SaveStatus::Saving;
        log::trace!("Auto-save: issued {:?}", ticket);
        Some(ticket)
    }

    /// Record the outcome of a save. Returns `false` for an unknown ticket.
    ///
    /// A failure is not retried on its own. The changes stay unsaved, so the
    /// next change or a forced flush sends them again, and the error status
    /// stays until a save succeeds.
    pub fn finish(&mut self, ticket: SaveTicket, success: bool) -> bool {
        if self.in_flight != Some(ticket) {
            log::debug!("Auto-save: ignoring result for unknown {:?}", ticket);
            return false;
        }
        self.in_flight = None;
        let detached = self.detached.take() == Some(ticket);
        if success {
            self.status = SaveStatus::Saved;
        } else {
            self.status = SaveStatus::Error;
            if detached {
                log::warn!("Auto-save: save for a previous image failed");
            } else {
                self.dirty = true;
            }
        }
        true
    }

    /// Forget pending changes when switching images. An in-flight save keeps
    /// its ticket so its result still updates the status.
    pub fn reset(&mut self) {
        self.detached = self.in_flight;
        self.last_change = None;
        self.dirty = false;
        self.ready = false;
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_scheduler() -> SaveScheduler {
        let mut scheduler = SaveScheduler::new().with_debounce_delay(Duration::from_secs(1));
        scheduler.set_ready(true);
        scheduler
    }

    #[test]
    fn test_initial_state() {
        let scheduler = SaveScheduler::new();
        assert!(!scheduler.is_dirty());
        assert!(!scheduler.should_save(Instant::now()));
        assert!(scheduler.is_enabled());
        assert_eq!(scheduler.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_changes_before_load_are_ignored() {
        let mut scheduler = SaveScheduler::new();
        scheduler.mark_dirty(Instant::now());
        assert!(!scheduler.is_dirty());
    }

    #[test]
    fn test_debounce_restarts_on_each_change() {
        let mut scheduler = ready_scheduler();
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        scheduler.mark_dirty(t0 + Duration::from_millis(800));

        assert!(!scheduler.should_save(t0 + Duration::from_millis(1500)));
        assert_eq!(
            scheduler.time_until_due(t0 + Duration::from_millis(1500)),
            Some(Duration::from_millis(300))
        );
        assert!(scheduler.should_save(t0 + Duration::from_millis(1800)));
    }

    #[test]
    fn test_single_save_in_flight() {
        let mut scheduler = ready_scheduler();
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        let later = t0 + Duration::from_secs(2);
        let ticket = scheduler.begin(later, false).unwrap();
        assert_eq!(scheduler.status(), SaveStatus::Saving);

        scheduler.mark_dirty(later);
        let much_later = later + Duration::from_secs(5);
        assert!(!scheduler.should_save(much_later));
        assert!(scheduler.begin(much_later, true).is_none());

        assert!(scheduler.finish(ticket, true));
        assert!(scheduler.should_save(much_later));
    }

    #[test]
    fn test_error_persists_until_next_success() {
        let mut scheduler = ready_scheduler();
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        let ticket = scheduler.begin(t0 + Duration::from_secs(1), false).unwrap();
        scheduler.finish(ticket, false);
        assert_eq!(scheduler.status(), SaveStatus::Error);
        // Not retried on its own.
        assert!(!scheduler.should_save(t0 + Duration::from_secs(60)));

        scheduler.mark_dirty(t0 + Duration::from_secs(61));
        let ticket = scheduler.begin(t0 + Duration::from_secs(62), false).unwrap();
        assert_eq!(scheduler.status(), SaveStatus::Saving);
        scheduler.finish(ticket, true);
        assert_eq!(scheduler.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut scheduler = ready_scheduler();
        let now = Instant::now();
        scheduler.mark_dirty(now);
        let ticket = scheduler.begin(now, true).unwrap();
        assert!(scheduler.finish(ticket, true));
        assert!(!scheduler.finish(ticket, false));
        assert_eq!(scheduler.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_disabled_still_allows_forced_save() {
        let mut scheduler = SaveScheduler::disabled();
        scheduler.set_ready(true);
        let now = Instant::now();
        scheduler.mark_dirty(now);
        assert!(!scheduler.should_save(now + Duration::from_secs(10)));
        assert!(scheduler.begin(now, true).is_some());
    }

    #[test]
    fn test_forced_save_needs_changes() {
        let mut scheduler = ready_scheduler();
        let now = Instant::now();
        assert!(scheduler.begin(now, true).is_none());

        scheduler.mark_dirty(now);
        let ticket = scheduler.begin(now, true).unwrap();
        scheduler.finish(ticket, true);
        assert!(scheduler.begin(now, true).is_none());
    }

    #[test]
    fn test_failed_save_stays_unsaved() {
        let mut scheduler = ready_scheduler();
        let t0 = Instant::now();
        scheduler.mark_dirty(t0);
        let ticket = scheduler.begin(t0, true).unwrap();
        scheduler.finish(ticket, false);

        assert!(scheduler.is_dirty());
        assert!(scheduler.time_until_due(t0 + Duration::from_secs(60)).is_none());
        assert!(scheduler.begin(t0 + Duration::from_secs(60), true).is_some());
    }

    #[test]
    fn test_failed_save_of_previous_image_leaves_new_image_clean() {
        let mut scheduler = ready_scheduler();
        let now = Instant::now();
        scheduler.mark_dirty(now);
        let ticket = scheduler.begin(now, true).unwrap();

        scheduler.reset();
        scheduler.set_ready(true);
        assert!(scheduler.finish(ticket, false));
        assert_eq!(scheduler.status(), SaveStatus::Error);
        assert!(!scheduler.is_dirty());
        assert!(scheduler.begin(now, true).is_none());
    }

    #[test]
    fn test_reset_drops_pending_change() {
        let mut scheduler = ready_scheduler();
        scheduler.mark_dirty(Instant::now());
        scheduler.reset();
        assert!(!scheduler.is_dirty());
        assert!(!scheduler.is_ready());
    }
}
