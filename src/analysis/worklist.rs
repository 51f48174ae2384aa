//! A deduplicating FIFO worklist.

use std::collections::VecDeque;

use crate::utils::ArenaId;

/// A queue of ids in which each id is pending at most once.
///
/// Re-queuing an id that is already pending is a no-op; once popped, the id
/// may be queued again.
#[derive(Debug, Clone)]
pub struct Worklist<I> {
    queue: VecDeque<I>,
    pending: Vec<bool>,
}

impl<I: ArenaId> Worklist<I> {
    /// Creates an empty worklist.
    #[must_use]
    pub fn new() -> Self {
        Worklist {
            queue: VecDeque::new(),
            pending: Vec::new(),
        }
    }

    /// Queues `id` unless it is already pending. Returns `true` if it was queued.
    pub fn push(&mut self, id: I) -> bool {
        let index = id.index();
        if index >= self.pending.len() {
            self.pending.resize(index + 1, false);
        }
        if self.pending[index] {
            return false;
        }
        self.pending[index] = true;
        self.queue.push_back(id);
        true
    }

    /// Removes the oldest pending id.
    pub fn pop(&mut self) -> Option<I> {
        let id = self.queue.pop_front()?;
        self.pending[id.index()] = false;
        Some(id)
    }

    /// Number of pending ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<I: ArenaId> Default for Worklist<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId> Extend<I> for Worklist<I> {
    fn extend<T: IntoIterator<Item = I>>(&mut self, iter: T) {
        for id in iter {
            self.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StmtId;

    #[test]
    fn test_pending_ids_are_deduplicated() {
        let mut list = Worklist::new();
        assert!(list.push(StmtId::new(3)));
        assert!(list.push(StmtId::new(1)));
        assert!(!list.push(StmtId::new(3)));
        assert_eq!(list.len(), 2);

        assert_eq!(list.pop(), Some(StmtId::new(3)));
        assert!(list.push(StmtId::new(3)));
        assert_eq!(list.pop(), Some(StmtId::new(1)));
        assert_eq!(list.pop(), Some(StmtId::new(3)));
        assert!(list.is_empty());
    }
}
