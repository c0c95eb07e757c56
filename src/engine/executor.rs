//! Single-threaded task queue with an injectable clock.
//!
//! The engine never blocks and never spawns. Deferred work is parked here as
//! one of two kinds of entries and run when the host drives the queue:
//!
//! - **timers**: due at an absolute time, cancellable (the debounce timer is
//!   re-armed by cancelling and re-adding);
//! - **idle requests**: run at the host's next idle period, or forced once
//!   their max-wait deadline passes. Hosts without an idle facility get a
//!   plain timer after a fixed fallback delay instead.
//!
//! ```text
//! host idle  ──▶ pop_idle()      ──▶ oldest idle request
//! host timer ──▶ pop_due(now)    ──▶ due timers, then overdue idle requests
//! ```
//!
//! Time is read through [`Clock`], so tests can step a [`ManualClock`] and
//! observe every yield point deterministically.

use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::time::Instant;

/// Milliseconds on the engine's clock.
pub type Millis = u64;

pub trait Clock {
    fn now(&self) -> Millis;
}

/// Monotonic wall clock, counted from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: Millis) {
        self.now.set(self.now.get() + ms);
    }

    /// Move to `at`; the clock never goes backwards.
    pub fn set(&self, at: Millis) {
        self.now.set(self.now.get().max(at));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}

/// Whether the host can call back during idle periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleSupport {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Task {
    /// Process the next slice of pending text units.
    ScanSlice,
    /// Debounce window elapsed: drain the mutation root set.
    FlushMutations,
}

#[derive(Debug)]
struct IdleEntry {
    handle: TaskHandle,
    task: Task,
    deadline: Millis,
}

#[derive(Debug)]
pub(crate) struct TaskQueue {
    timers: BinaryHeap<Reverse<(Millis, TaskHandle, Task)>>,
    idle: VecDeque<IdleEntry>,
    cancelled: HashSet<TaskHandle>,
    next_handle: u64,
    idle_support: IdleSupport,
    fallback_delay: Millis,
}

impl TaskQueue {
    pub(crate) fn new(idle_support: IdleSupport, fallback_delay: Millis) -> Self {
        TaskQueue {
            timers: BinaryHeap::new(),
            idle: VecDeque::new(),
            cancelled: HashSet::new(),
            next_handle: 0,
            idle_support,
            fallback_delay,
        }
    }

    fn handle(&mut self) -> TaskHandle {
        self.next_handle += 1;
        TaskHandle(self.next_handle)
    }

    pub(crate) fn set_timeout(&mut self, now: Millis, delay: Millis, task: Task) -> TaskHandle {
        let handle = self.handle();
        self.timers.push(Reverse((now + delay, handle, task)));
        handle
    }

    /// Run `task` at the next idle period, but no later than `now + max_wait`.
    pub(crate) fn request_idle(&mut self, now: Millis, max_wait: Millis, task: Task) -> TaskHandle {
        match self.idle_support {
            IdleSupport::Available => {
                let handle = self.handle();
                self.idle.push_back(IdleEntry { handle, task, deadline: now + max_wait });
                handle
            }
            IdleSupport::Unavailable => self.set_timeout(now, self.fallback_delay, task),
        }
    }

    pub(crate) fn cancel(&mut self, handle: TaskHandle) {
        let queued_idle = self.idle.len();
        self.idle.retain(|e| e.handle != handle);
        if self.idle.len() == queued_idle && self.timers.iter().any(|Reverse((_, h, _))| *h == handle) {
            self.cancelled.insert(handle);
        }
    }

    /// Next task whose time has come: a due timer or an overdue idle request,
    /// whichever is earlier (timers win ties).
    pub(crate) fn pop_due(&mut self, now: Millis) -> Option<Task> {
        self.purge_cancelled();
        let timer_due = self.timers.peek().map(|Reverse((due, _, _))| *due).filter(|&due| due <= now);
        let idle_due = self.idle.front().map(|e| e.deadline).filter(|&deadline| deadline <= now);

        match (timer_due, idle_due) {
            (Some(t), Some(i)) if i < t => self.idle.pop_front().map(|e| e.task),
            (Some(_), _) => self.timers.pop().map(|Reverse((_, _, task))| task),
            (None, Some(_)) => self.idle.pop_front().map(|e| e.task),
            (None, None) => None,
        }
    }

    /// The host is idle: hand out the oldest idle request.
    pub(crate) fn pop_idle(&mut self) -> Option<Task> {
        self.idle.pop_front().map(|e| e.task)
    }

    /// Earliest time at which [`TaskQueue::pop_due`] will yield something.
    pub(crate) fn next_deadline(&self) -> Option<Millis> {
        let timer = self
            .timers
            .iter()
            .filter(|Reverse((_, h, _))| !self.cancelled.contains(h))
            .map(|Reverse((due, _, _))| *due)
            .min();
        let idle = self.idle.iter().map(|e| e.deadline).min();
        match (timer, idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn has_idle_work(&self) -> bool {
        !self.idle.is_empty()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.idle.is_empty() && self.timers.len() == self.cancelled.len()
    }

    fn purge_cancelled(&mut self) {
        while let Some(Reverse((_, handle, _))) = self.timers.peek() {
            if !self.cancelled.remove(handle) {
                break;
            }
            self.timers.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_due_order() {
        let mut q = TaskQueue::new(IdleSupport::Available, 50);
        q.set_timeout(0, 120, Task::FlushMutations);
        q.set_timeout(0, 10, Task::ScanSlice);

        assert_eq!(q.pop_due(5), None);
        assert_eq!(q.next_deadline(), Some(10));
        assert_eq!(q.pop_due(200), Some(Task::ScanSlice));
        assert_eq!(q.pop_due(200), Some(Task::FlushMutations));
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TaskQueue::new(IdleSupport::Available, 50);
        let first = q.set_timeout(0, 120, Task::FlushMutations);
        q.cancel(first);
        q.set_timeout(100, 120, Task::FlushMutations);

        assert_eq!(q.next_deadline(), Some(220));
        assert_eq!(q.pop_due(150), None);
        assert_eq!(q.pop_due(220), Some(Task::FlushMutations));
        assert!(q.is_empty());
    }

    #[test]
    fn idle_requests_run_when_idle_or_when_overdue() {
        let mut q = TaskQueue::new(IdleSupport::Available, 50);
        q.request_idle(0, 500, Task::ScanSlice);
        assert!(q.has_idle_work());
        assert_eq!(q.pop_due(499), None);
        assert_eq!(q.pop_idle(), Some(Task::ScanSlice));

        q.request_idle(0, 500, Task::ScanSlice);
        assert_eq!(q.pop_due(500), Some(Task::ScanSlice));
        assert!(q.is_empty());
    }

    #[test]
    fn missing_idle_support_falls_back_to_a_timer() {
        let mut q = TaskQueue::new(IdleSupport::Unavailable, 50);
        q.request_idle(10, 500, Task::ScanSlice);

        assert!(!q.has_idle_work());
        assert_eq!(q.pop_idle(), None);
        assert_eq!(q.next_deadline(), Some(60));
        assert_eq!(q.pop_due(59), None);
        assert_eq!(q.pop_due(60), Some(Task::ScanSlice));
    }

    #[test]
    fn manual_clock_only_moves_forward() {
        let clock = ManualClock::new();
        clock.advance(30);
        clock.set(10);
        assert_eq!(clock.now(), 30);
        clock.set(45);
        assert_eq!(clock.now(), 45);
    }
}
