//! Snapshot-based undo/redo.
//!
//! Every edit pushes a full copy of the map taken before the edit. Undo and
//! redo swap the live map with the top of the respective stack.

use crate::ConceptMap;

/// Default maximum number of undo snapshots.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Handle to a pushed snapshot: the undo depth right after the push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotToken(usize);

impl SnapshotToken {
    /// Undo depth at the time of the snapshot.
    #[must_use]
    pub const fn depth(self) -> usize {
        self.0
    }
}

/// Undo and redo stacks of whole-map snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<ConceptMap>,
    redo_stack: Vec<ConceptMap>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Create empty stacks keeping at most `limit` undo snapshots.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state before an edit. Clears the redo stack.
    pub fn snapshot(&mut self, map: &ConceptMap) -> SnapshotToken {
        self.push(map.clone())
    }

    /// Record an already-copied pre-edit state. Clears the redo stack.
    pub fn push(&mut self, before: ConceptMap) -> SnapshotToken {
        self.undo_stack.push(before);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
        SnapshotToken(self.undo_stack.len())
    }

    /// Step back. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, live: &mut ConceptMap) -> bool {
        let Some(mut previous) = self.undo_stack.pop() else {
            return false;
        };
        std::mem::swap(live, &mut previous);
        self.redo_stack.push(previous);
        tracing::debug!(
            "Undo: {} undo / {} redo remaining",
            self.undo_stack.len(),
            self.redo_stack.len()
        );
        true
    }

    /// Step forward. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, live: &mut ConceptMap) -> bool {
        let Some(mut next) = self.redo_stack.pop() else {
            return false;
        };
        std::mem::swap(live, &mut next);
        self.undo_stack.push(next);
        tracing::debug!(
            "Redo: {} undo / {} redo remaining",
            self.undo_stack.len(),
            self.redo_stack.len()
        );
        true
    }

    /// Whether undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo snapshots.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redo snapshots.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
