use std::collections::VecDeque;

use crate::edit::state::EditState;

/// Linear undo/redo over whole [`EditState`] snapshots.
///
/// `undo` holds past states oldest-first, its top being the state currently shown.
/// `redo` holds states undone, nearest-first.
#[derive(Clone, Debug, Default)]
pub struct History {
    undo: Vec<EditState>,
    redo: VecDeque<EditState>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` as a new step. Any redo branch is discarded.
    pub fn snapshot(&mut self, current: &EditState) {
        self.undo.push(*current);
        self.redo.clear();
        tracing::debug!(depth = self.undo.len(), "history snapshot");
    }

    /// Step back. Returns the state to apply, or `None` when there is nothing to undo.
    ///
    /// Popping the last entry yields `fallback` (the pristine default).
    pub fn undo(&mut self, fallback: &EditState) -> Option<EditState> {
        let top = self.undo.pop()?;
        self.redo.push_front(top);
        Some(self.undo.last().copied().unwrap_or(*fallback))
    }

    /// Step forward. Returns the state to apply, or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<EditState> {
        let next = self.redo.pop_front()?;
        self.undo.push(next);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
