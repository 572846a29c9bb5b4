//! Cancellable timers on a virtual clock.
//!
//! # Responsibility
//! - Queue callbacks to run after a delay and let callers cancel them by id.
//! - Provide a trailing-edge `Debouncer` that keeps at most one pending timer.
//!
//! # Invariants
//! - Time only moves through `advance`; nothing fires on its own.
//! - Due timers fire in deadline order, then scheduling order.
//! - No borrow of the timer queue is held while a callback runs, so callbacks
//!   may schedule or cancel timers.
//! - A cancelled timer never fires.

use crate::logging::panic_message;
use log::{debug, error};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;

type TimerFn = Box<dyn FnOnce()>;

/// Identifier of one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Default)]
struct TimerQueue {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<(Duration, TimerId), TimerFn>,
    deadlines: HashMap<TimerId, Duration>,
}

impl TimerQueue {
    fn take(&mut self, id: TimerId) -> Option<TimerFn> {
        let deadline = self.deadlines.remove(&id)?;
        self.timers.remove(&(deadline, id))
    }

    fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerFn)> {
        let (&(deadline, id), _) = self.timers.iter().next()?;
        if deadline > until {
            return None;
        }
        self.now = self.now.max(deadline);
        self.deadlines.remove(&id);
        self.timers.remove(&(deadline, id)).map(|task| (id, task))
    }
}

/// Shared handle to a timer queue.
///
/// Clones refer to the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<TimerQueue>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    /// Queues `task` to run once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerHandle {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        let id = TimerId(queue.next_id);
        let deadline = queue.now + delay;
        queue.timers.insert((deadline, id), Box::new(task));
        queue.deadlines.insert(id, deadline);
        TimerHandle {
            id,
            queue: Rc::downgrade(&self.queue),
        }
    }

    /// Drops a pending timer. Returns `false` when it already fired or was
    /// cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.queue.borrow_mut().take(id).is_some()
    }

    /// Runs a pending timer immediately, removing it from the queue.
    pub fn run_now(&self, id: TimerId) -> bool {
        let task = self.queue.borrow_mut().take(id);
        match task {
            Some(task) => {
                run_task(id, task);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.borrow().deadlines.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().timers.len()
    }

    /// Moves time forward by `elapsed`, firing every timer that comes due.
    ///
    /// Returns the number of timers fired.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let target = self.now() + elapsed;
        let mut fired = 0;
        loop {
            let next = self.queue.borrow_mut().pop_due(target);
            let Some((id, task)) = next else {
                break;
            };
            run_task(id, task);
            fired += 1;
        }
        self.queue.borrow_mut().now = target;
        fired
    }
}

fn run_task(id: TimerId, task: TimerFn) {
    debug!("event=timer_fire module=scheduler status=start id={}", id.0);
    if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
        error!(
            "event=timer_fire module=scheduler status=error id={} panic={}",
            id.0,
            panic_message(payload.as_ref())
        );
    }
}

/// Id of a scheduled timer plus the means to cancel it.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: TimerId,
    queue: Weak<RefCell<TimerQueue>>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Cancels the timer; a no-op once it fired.
    pub fn cancel(&self) -> bool {
        match self.queue.upgrade() {
            Some(queue) => queue.borrow_mut().take(self.id).is_some(),
            None => false,
        }
    }
}

/// Trailing-edge debounce: only the last call in a quiet window runs.
pub struct Debouncer {
    scheduler: Scheduler,
    delay: Duration,
    pending: Rc<Cell<Option<TimerId>>>,
}

impl Debouncer {
    pub fn new(scheduler: Scheduler, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending call with `task`, restarting the quiet window.
    pub fn call(&self, task: impl FnOnce() + 'static) -> TimerId {
        self.cancel();
        let pending = Rc::clone(&self.pending);
        let handle = self.scheduler.schedule(self.delay, move || {
            pending.set(None);
            task();
        });
        self.pending.set(Some(handle.id()));
        handle.id()
    }

    /// Drops the pending call, if any.
    pub fn cancel(&self) -> bool {
        match self.pending.take() {
            Some(id) => self.scheduler.cancel(id),
            None => false,
        }
    }

    /// Runs the pending call now instead of waiting for the window to close.
    pub fn flush(&self) -> bool {
        match self.pending.get() {
            Some(id) => self.scheduler.run_now(id),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Debouncer, Scheduler};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn log_sink() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn fires_in_deadline_order() {
        let scheduler = Scheduler::new();
        let log = log_sink();
        let late = Rc::clone(&log);
        scheduler.schedule(Duration::from_millis(20), move || late.borrow_mut().push("late"));
        let early = Rc::clone(&log);
        scheduler.schedule(Duration::from_millis(10), move || early.borrow_mut().push("early"));

        assert_eq!(scheduler.advance(Duration::from_millis(5)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(15)), 2);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let scheduler = Scheduler::new();
        let log = log_sink();
        let sink = Rc::clone(&log);
        let handle = scheduler.schedule(Duration::from_millis(1), move || sink.borrow_mut().push("x"));

        assert!(handle.cancel());
        assert!(!handle.cancel());
        scheduler.advance(Duration::from_secs(1));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn callbacks_may_schedule_follow_ups_within_same_advance() {
        let scheduler = Scheduler::new();
        let log = log_sink();
        let inner_scheduler = scheduler.clone();
        let sink = Rc::clone(&log);
        scheduler.schedule(Duration::from_millis(10), move || {
            sink.borrow_mut().push("first");
            let sink = Rc::clone(&sink);
            inner_scheduler.schedule(Duration::from_millis(10), move || {
                sink.borrow_mut().push("second")
            });
        });

        assert_eq!(scheduler.advance(Duration::from_millis(25)), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn panicking_timer_does_not_stop_queue() {
        let scheduler = Scheduler::new();
        let log = log_sink();
        scheduler.schedule(Duration::ZERO, || panic!("boom"));
        let sink = Rc::clone(&log);
        scheduler.schedule(Duration::ZERO, move || sink.borrow_mut().push("after"));

        assert_eq!(scheduler.advance(Duration::ZERO), 2);
        assert_eq!(*log.borrow(), vec!["after"]);
    }

    #[test]
    fn debouncer_keeps_only_last_call() {
        let scheduler = Scheduler::new();
        let debouncer = Debouncer::new(scheduler.clone(), Duration::from_millis(100));
        let log = Rc::new(RefCell::new(Vec::new()));

        for value in 1..=3 {
            let sink = Rc::clone(&log);
            debouncer.call(move || sink.borrow_mut().push(value));
            scheduler.advance(Duration::from_millis(60));
        }
        assert!(log.borrow().is_empty());
        assert!(debouncer.is_pending());

        scheduler.advance(Duration::from_millis(40));
        assert_eq!(*log.borrow(), vec![3]);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn debouncer_flush_runs_pending_call_once() {
        let scheduler = Scheduler::new();
        let debouncer = Debouncer::new(scheduler.clone(), Duration::from_millis(100));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        debouncer.call(move || sink.borrow_mut().push("saved"));

        assert!(debouncer.flush());
        assert!(!debouncer.flush());
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(*log.borrow(), vec!["saved"]);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
