//! Undo/Redo history for annotation edits.
//!
//! History is a bounded log of full snapshots plus a cursor pointing at the
//! snapshot that matches the current state. Committing after an undo drops
//! everything ahead of the cursor.

use std::collections::VecDeque;

use crate::constants::HISTORY_LIMIT;

// ============================================================================
// History
// ============================================================================

/// Bounded snapshot history.
///
/// `History` never holds fewer than one entry once [`History::reset`] has
/// been called: the baseline is the state undo can return to last.
///
/// # Example
/// ```
/// use posemark::undo::History;
///
/// let mut history: History<i32> = History::new(50);
/// history.reset(0);
/// history.commit(1);
/// history.commit(2);
///
/// assert_eq!(history.undo(), Some(1));
/// assert_eq!(history.undo(), Some(0));
/// assert_eq!(history.undo(), None);
/// assert_eq!(history.redo(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    entries: VecDeque<T>,
    /// Index of the entry matching the current state.
    cursor: usize,
    limit: usize,
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl<T: Clone> History<T> {
    /// Create an empty history keeping at most `limit` snapshots.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Discard all history and start over from `baseline`.
    pub fn reset(&mut self, baseline: T) {
        self.entries.clear();
        self.entries.push_back(baseline);
        self.cursor = 0;
        log::debug!("History reset");
    }

    /// Record the state after an edit.
    ///
    /// Redo entries are dropped. When the log is full the oldest snapshot is
    /// evicted.
    pub fn commit(&mut self, snapshot: T) {
        if self.entries.is_empty() {
            self.reset(snapshot);
            return;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        log::trace!("History commit: {} entries", self.entries.len());
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step back and return the snapshot to restore.
    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        log::debug!("Undo to history entry {}", self.cursor);
        self.entries.get(self.cursor).cloned()
    }

    /// Step forward and return the snapshot to restore.
    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        log::debug!("Redo to history entry {}", self.cursor);
        self.entries.get(self.cursor).cloned()
    }

    /// Snapshot matching the current state.
    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    /// Number of retained snapshots, baseline included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Get number of undo steps available
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Get number of redo steps available
    pub fn redo_count(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor + 1)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_walks_the_log() {
        let mut history = History::new(10);
        history.reset("a");
        history.commit("b");
        history.commit("c");

        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some("b"));
        assert_eq!(history.undo(), Some("a"));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), Some("b"));
        assert_eq!(history.current(), Some(&"b"));
    }

    #[test]
    fn test_commit_after_undo_drops_redo() {
        let mut history = History::new(10);
        history.reset(0);
        history.commit(1);
        history.commit(2);
        history.undo();
        history.commit(3);

        assert!(!history.can_redo());
        assert_eq!(history.undo(), Some(1));
        assert_eq!(history.redo(), Some(3));
    }

    #[test]
    fn test_bounded_to_limit() {
        let mut history = History::new(50);
        history.reset(0);
        for edit in 1..=60 {
            history.commit(edit);
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.current(), Some(&60));

        let mut last = None;
        for _ in 0..50 {
            if let Some(state) = history.undo() {
                last = Some(state);
            }
        }
        // Earliest retained edit, not the original baseline.
        assert_eq!(last, Some(11));
        assert_eq!(history.current(), Some(&11));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut history = History::new(5);
        history.reset(0);
        history.commit(1);
        history.reset(7);
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.current(), Some(&7));
    }

    #[test]
    fn test_commit_without_baseline_becomes_baseline() {
        let mut history = History::new(5);
        history.commit(4);
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_counts() {
        let mut history = History::default();
        history.reset(0);
        history.commit(1);
        history.commit(2);
        history.undo();
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.redo_count(), 1);
        assert_eq!(history.limit(), HISTORY_LIMIT);
    }
}
