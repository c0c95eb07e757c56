//! Mutation root set with a resettable quiet-window timer.
//!
//! Every change notification contributes a root (an added element, or the
//! parent of an added or edited text unit). The roots are collected in an
//! insertion-ordered set and the flush timer is pushed back to
//! `now + window` on each contribution, so a burst of edits ends in one
//! firing. The firing drains the whole set at once.
//!
//! ```text
//! edits:   x  x x   x                 x
//! timer:   |--|-|---|------120ms----▶ fire     |---...
//! roots:   {p} {p,div}                drain→[]
//! ```

use crate::NodeId;
use crate::engine::executor::{Millis, Task, TaskHandle, TaskQueue};
use indexmap::IndexSet;

#[derive(Debug)]
pub(crate) struct Debouncer {
    roots: IndexSet<NodeId>,
    timer: Option<TaskHandle>,
    window: Millis,
}

impl Debouncer {
    pub(crate) fn new(window: Millis) -> Self {
        Debouncer { roots: IndexSet::new(), timer: None, window }
    }

    /// Record `root` and restart the quiet window.
    pub(crate) fn note(&mut self, root: NodeId, queue: &mut TaskQueue, now: Millis) {
        self.roots.insert(root);
        if let Some(handle) = self.timer.take() {
            queue.cancel(handle);
        }
        self.timer = Some(queue.set_timeout(now, self.window, Task::FlushMutations));
    }

    /// The timer fired: take every root collected so far.
    pub(crate) fn drain(&mut self) -> Vec<NodeId> {
        self.timer = None;
        std::mem::take(&mut self.roots).into_iter().collect()
    }

    pub(crate) fn pending_roots(&self) -> usize {
        self.roots.len()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    pub(crate) fn clear(&mut self, queue: &mut TaskQueue) {
        if let Some(handle) = self.timer.take() {
            queue.cancel(handle);
        }
        self.roots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::executor::IdleSupport;

    #[test]
    fn burst_of_notes_fires_once_after_quiet_window() {
        let mut queue = TaskQueue::new(IdleSupport::Available, 50);
        let mut d = Debouncer::new(120);

        for i in 0..50 {
            d.note(NodeId(7), &mut queue, i * 2);
        }
        assert_eq!(d.pending_roots(), 1);
        assert_eq!(queue.next_deadline(), Some(98 + 120));

        assert_eq!(queue.pop_due(217), None);
        assert_eq!(queue.pop_due(218), Some(Task::FlushMutations));
        assert_eq!(queue.pop_due(1_000), None);

        assert_eq!(d.drain(), vec![NodeId(7)]);
        assert!(!d.is_armed());
    }

    #[test]
    fn roots_keep_first_insertion_order() {
        let mut queue = TaskQueue::new(IdleSupport::Available, 50);
        let mut d = Debouncer::new(120);
        for id in [3, 1, 3, 2, 1] {
            d.note(NodeId(id), &mut queue, 0);
        }
        assert_eq!(d.drain(), vec![NodeId(3), NodeId(1), NodeId(2)]);
        assert_eq!(d.pending_roots(), 0);
    }

    #[test]
    fn clear_cancels_the_timer() {
        let mut queue = TaskQueue::new(IdleSupport::Available, 50);
        let mut d = Debouncer::new(120);
        d.note(NodeId(1), &mut queue, 0);
        d.clear(&mut queue);

        assert!(queue.is_empty());
        assert_eq!(queue.pop_due(500), None);
    }
}
