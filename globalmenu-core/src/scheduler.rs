// SPDX-License-Identifier: LGPL-3.0-only
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Handle to a queued continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Queue of continuations run by the owning event loop.
///
/// Idle tasks run on the next idle turn; delayed tasks run once their
/// deadline passed. Tasks posted while a batch runs wait for the next turn.
#[derive(Debug)]
pub struct Scheduler<T> {
    next: u64,
    idle: VecDeque<(TaskId, T)>,
    timers: Vec<(Instant, TaskId, T)>,
    cancelled: HashSet<TaskId>,
}

impl<T> Scheduler<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            next: 0,
            idle: VecDeque::new(),
            timers: Vec::new(),
            cancelled: HashSet::new(),
        }
    }

    fn allocate(&mut self) -> TaskId {
        self.next += 1;
        TaskId(self.next)
    }

    /// Run `task` on the next idle turn.
    pub fn post_idle(&mut self, task: T) -> TaskId {
        let id = self.allocate();
        self.idle.push_back((id, task));
        id
    }

    /// Run `task` once `delay` elapsed after `now`.
    pub fn post_delayed(&mut self, now: Instant, delay: Duration, task: T) -> TaskId {
        let id = self.allocate();
        self.timers.push((now + delay, id, task));
        id
    }

    /// Cancel a queued task. Returns `false` if it already ran or never existed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let queued = self.idle.iter().any(|(task, _)| *task == id)
            || self.timers.iter().any(|(_, task, _)| *task == id);
        if queued {
            self.cancelled.insert(id);
        }
        queued
    }

    /// Take the current idle batch, skipping cancelled tasks.
    pub fn take_idle(&mut self) -> Vec<T> {
        let batch: Vec<(TaskId, T)> = self.idle.drain(..).collect();
        let mut out = Vec::with_capacity(batch.len());
        for (id, task) in batch {
            if !self.cancelled.remove(&id) {
                out.push(task);
            }
        }
        out
    }

    /// Take every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.timers)
            .into_iter()
            .partition(|(deadline, _, _)| *deadline <= now);
        self.timers = pending;
        due.sort_by_key(|(deadline, id, _)| (*deadline, *id));
        let mut out = Vec::with_capacity(due.len());
        for (_, id, task) in due {
            if !self.cancelled.remove(&id) {
                out.push(task);
            }
        }
        out
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .iter()
            .filter(|(_, id, _)| !self.cancelled.contains(id))
            .map(|(deadline, _, _)| *deadline)
            .min()
    }

    /// Number of idle tasks waiting, cancelled ones excluded.
    pub fn idle_len(&self) -> usize {
        self.idle
            .iter()
            .filter(|(id, _)| !self.cancelled.contains(id))
            .count()
    }

    /// Number of timers waiting, cancelled ones excluded.
    pub fn timer_len(&self) -> usize {
        self.timers
            .iter()
            .filter(|(_, id, _)| !self.cancelled.contains(id))
            .count()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_batch_skips_cancelled() {
        let mut scheduler = Scheduler::new();
        scheduler.post_idle("a");
        let b = scheduler.post_idle("b");
        scheduler.post_idle("c");
        assert!(scheduler.cancel(b));
        assert_eq!(scheduler.take_idle(), vec!["a", "c"]);
        assert!(!scheduler.cancel(b));
        assert_eq!(scheduler.idle_len(), 0);
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        let now = Instant::now();
        scheduler.post_delayed(now, Duration::from_millis(200), "late");
        scheduler.post_delayed(now, Duration::from_millis(100), "early");
        assert!(scheduler.take_due(now).is_empty());
        assert_eq!(scheduler.next_deadline(), Some(now + Duration::from_millis(100)));
        assert_eq!(
            scheduler.take_due(now + Duration::from_millis(250)),
            vec!["early", "late"]
        );
        assert_eq!(scheduler.timer_len(), 0);
    }
}
