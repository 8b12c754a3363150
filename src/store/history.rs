use std::collections::VecDeque;
use std::sync::Arc;

use crate::model::task::Task;

/// A full copy of the task collection. Snapshots are shared, so an
/// unchanged collection costs one pointer per entry.
pub type Snapshot = Arc<Vec<Task>>;

pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Snapshot-based undo/redo stacks.
///
/// `past` holds the states before each mutation, oldest first. `future`
/// holds undone states, the next one to redo at the front.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: VecDeque<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// A limit of zero keeps no history at all
    pub fn new(limit: usize) -> Self {
        History {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit,
        }
    }

    /// Record the state before a mutation. Clears the redo stack.
    pub fn record(&mut self, before: Snapshot) {
        self.future.clear();
        if self.limit == 0 {
            return;
        }
        self.past.push_back(before);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }

    /// Step back: returns the snapshot to restore and remembers `current`
    /// for redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.past.pop_back()?;
        self.future.push_front(current);
        Some(previous)
    }

    /// Step forward: returns the snapshot to restore and remembers `current`
    /// for undo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop_front()?;
        self.past.push_back(current);
        Some(next)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// (undo depth, redo depth)
    pub fn depth(&self) -> (usize, usize) {
        (self.past.len(), self.future.len())
    }
}
