//! Slice bookkeeping for the batch scheduler.
//!
//! Pending text units wait here in arrival order. The linker takes them out
//! `batch_size` at a time; between two slices control goes back to the host
//! and the next slice is requested as an idle task. `armed` records whether
//! such a request is outstanding, so a second one is never issued.

use crate::NodeId;
use std::collections::{HashSet, VecDeque};

#[derive(Debug)]
pub(crate) struct BatchScheduler {
    pending: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
    batch_size: usize,
    armed: bool,
}

impl BatchScheduler {
    pub(crate) fn new(batch_size: usize) -> Self {
        BatchScheduler { pending: VecDeque::new(), queued: HashSet::new(), batch_size: batch_size.max(1), armed: false }
    }

    /// Queue `units`, skipping any already pending. Returns how many were added.
    pub(crate) fn enqueue(&mut self, units: impl IntoIterator<Item = NodeId>) -> usize {
        let mut added = 0;
        for unit in units {
            if self.queued.insert(unit) {
                self.pending.push_back(unit);
                added += 1;
            }
        }
        added
    }

    pub(crate) fn next_slice(&mut self) -> Vec<NodeId> {
        let n = self.batch_size.min(self.pending.len());
        let slice: Vec<NodeId> = self.pending.drain(..n).collect();
        for unit in &slice {
            self.queued.remove(unit);
        }
        slice
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn armed(&self) -> bool {
        self.armed
    }

    pub(crate) fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    /// Drop everything still pending.
    pub(crate) fn abandon(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.queued.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<u32>) -> Vec<NodeId> {
        range.map(NodeId).collect()
    }

    #[test]
    fn slices_respect_batch_size_and_order() {
        let mut s = BatchScheduler::new(3);
        assert_eq!(s.enqueue(ids(0..7)), 7);

        assert_eq!(s.next_slice(), ids(0..3));
        assert_eq!(s.next_slice(), ids(3..6));
        assert_eq!(s.next_slice(), ids(6..7));
        assert!(s.next_slice().is_empty());
        assert!(!s.has_pending());
    }

    #[test]
    fn pending_units_are_not_queued_twice() {
        let mut s = BatchScheduler::new(10);
        s.enqueue(ids(0..3));
        assert_eq!(s.enqueue(ids(2..5)), 2);
        assert_eq!(s.len(), 5);

        // Once taken, a unit may be queued again.
        s.next_slice();
        assert_eq!(s.enqueue(ids(0..1)), 1);
    }

    #[test]
    fn abandon_drops_everything() {
        let mut s = BatchScheduler::new(2);
        s.enqueue(ids(0..5));
        assert_eq!(s.abandon(), 5);
        assert!(!s.has_pending());
        assert_eq!(s.enqueue(ids(0..1)), 1);
    }
}
