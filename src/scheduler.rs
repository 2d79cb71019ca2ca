//! Deferred work with explicit cancellation handles.
//!
//! Time is read through [`Clock`], so tests drive a [`ManualClock`] forward
//! instead of sleeping.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    due: Duration,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    next_id: u64,
    tasks: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration, task: T) -> TaskHandle {
        self.schedule_at(now.saturating_add(delay), task)
    }

    pub fn schedule_at(&mut self, due: Duration, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.tasks.push(Scheduled { handle, due, task });
        handle
    }

    /// Returns the task if it had not fired yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let position = self.tasks.iter().position(|entry| entry.handle == handle)?;
        Some(self.tasks.remove(position).task)
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.tasks.len();
        self.tasks.clear();
        cancelled
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|entry| entry.handle == handle)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.tasks.iter().map(|entry| entry.due).min()
    }

    pub fn any_pending(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        self.tasks.iter().any(|entry| predicate(&entry.task))
    }

    /// Removes and returns every task due at `now`, earliest first; tasks due
    /// at the same instant keep scheduling order.
    pub fn drain_due(&mut self, now: Duration) -> Vec<T> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.tasks.len() {
            if self.tasks[index].due <= now {
                due.push(self.tasks.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| a.due.cmp(&b.due).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter().map(|entry| entry.task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn drains_only_due_tasks_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::ZERO, MS * 50, "late");
        scheduler.schedule(Duration::ZERO, MS * 10, "early");
        scheduler.schedule(Duration::ZERO, MS * 10, "early-second");

        assert!(scheduler.drain_due(MS * 5).is_empty());
        assert_eq!(scheduler.drain_due(MS * 10), vec!["early", "early-second"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.next_due(), Some(MS * 50));
        assert_eq!(scheduler.drain_due(MS * 60), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule(Duration::ZERO, MS, 1);
        let dropped = scheduler.schedule(Duration::ZERO, MS, 2);

        assert_eq!(scheduler.cancel(dropped), Some(2));
        assert_eq!(scheduler.cancel(dropped), None);
        assert!(scheduler.is_pending(keep));
        assert_eq!(scheduler.drain_due(MS), vec![1]);
        assert!(!scheduler.is_pending(keep));
    }

    #[test]
    fn manual_clock_advances_only_when_told() {
        let clock = Rc::new(ManualClock::new());
        let shared: Rc<dyn Clock> = clock.clone();
        assert_eq!(shared.now(), Duration::ZERO);
        clock.advance(MS * 100);
        assert_eq!(shared.now(), MS * 100);
    }
}
