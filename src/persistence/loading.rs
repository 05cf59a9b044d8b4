//! Staleness tracking for asynchronous annotation loads.

/// Issued for each load; a result is applied only if its ticket is current.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    image: String,
    generation: u64,
}

impl LoadTicket {
    pub fn image(&self) -> &str {
        &self.image
    }
}

/// Tracks which load, if any, the editor is waiting for.
#[derive(Debug, Clone, Default)]
pub struct LoadTracker {
    generation: u64,
    pending: Option<LoadTicket>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load, making every earlier ticket stale.
    pub fn begin(&mut self, image: impl Into<String>) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            image: image.into(),
            generation: self.generation,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.pending.as_ref() == Some(ticket)
    }

    /// Consume a ticket. Returns `false` if it was stale.
    pub fn finish(&mut self, ticket: &LoadTicket) -> bool {
        if self.is_current(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Mark the outstanding load, if any, as stale.
    pub fn invalidate(&mut self) {
        if let Some(ticket) = self.pending.take() {
            log::debug!("Load of '{}' invalidated", ticket.image);
        }
        self.generation += 1;
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_load_supersedes_older() {
        let mut tracker = LoadTracker::new();
        let first = tracker.begin("a.jpg");
        let second = tracker.begin("b.jpg");
        assert!(!tracker.finish(&first));
        assert!(tracker.finish(&second));
        assert!(!tracker.is_loading());
    }

    #[test]
    fn test_same_image_reopened_is_still_stale() {
        let mut tracker = LoadTracker::new();
        let first = tracker.begin("a.jpg");
        let _second = tracker.begin("a.jpg");
        assert!(!tracker.is_current(&first));
    }

    #[test]
    fn test_invalidate_discards_pending() {
        let mut tracker = LoadTracker::new();
        let ticket = tracker.begin("a.jpg");
        tracker.invalidate();
        assert!(!tracker.finish(&ticket));
    }
}
