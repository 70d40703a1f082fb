//! Virtual-time timer queue
//!
//! The cells in `settle_core` never own a clock; anything time-shaped is
//! composed from callbacks fired by an external scheduler. [`TimerQueue`] is
//! that scheduler, made deterministic: time is virtual and only moves when
//! the owner calls [`TimerQueue::advance`]. Due callbacks fire in deadline
//! order, ties in registration order, all on the calling thread.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use settle_task::TimerQueue;
//!
//! let timers = TimerQueue::new();
//! timers.schedule(Duration::from_millis(100), || println!("due"));
//! timers.advance(Duration::from_millis(100)); // fires here
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a scheduled callback
    pub struct TimerId;
}

struct TimerEntry {
    deadline: Duration,
    /// Registration sequence; breaks deadline ties.
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

struct QueueInner {
    timers: SlotMap<TimerId, TimerEntry>,
    now: Duration,
    next_seq: u64,
}

/// A deterministic single-threaded timer queue (cheap to clone; clones share
/// the queue).
pub struct TimerQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl Clone for TimerQueue {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueInner {
                timers: SlotMap::with_key(),
                now: Duration::ZERO,
                next_seq: 0,
            })),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of callbacks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Schedule `callback` to fire `after` the current virtual time.
    pub fn schedule(&self, after: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let mut queue = self.inner.borrow_mut();
        let deadline = queue.now + after;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.timers.insert(TimerEntry {
            deadline,
            seq,
            callback: Box::new(callback),
        })
    }

    /// Drop a scheduled callback before it fires. Returns false if it has
    /// already fired or was never scheduled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.inner.borrow_mut().timers.remove(id).is_some()
    }

    /// Move virtual time forward by `by`, firing every callback whose
    /// deadline lands inside the window - including callbacks scheduled by
    /// earlier firings, so chained timers resolve within one advance.
    pub fn advance(&self, by: Duration) {
        let target = self.inner.borrow().now + by;
        loop {
            let next = {
                let mut queue = self.inner.borrow_mut();
                let due = queue
                    .timers
                    .iter()
                    .filter(|(_, entry)| entry.deadline <= target)
                    .min_by_key(|(_, entry)| (entry.deadline, entry.seq))
                    .map(|(id, _)| id);
                match due.and_then(|id| queue.timers.remove(id)) {
                    Some(entry) => {
                        // Firing observes its own deadline as "now" so that
                        // callbacks scheduling relative timers stack up from
                        // the right instant.
                        queue.now = queue.now.max(entry.deadline);
                        Some(entry.callback)
                    }
                    None => {
                        queue.now = target;
                        None
                    }
                }
            };
            match next {
                Some(callback) => {
                    tracing::trace!("timer fired");
                    callback();
                }
                None => break,
            }
        }
    }

    /// Advance to each next deadline in turn until nothing is scheduled.
    pub fn run_until_idle(&self) {
        loop {
            let next_deadline = {
                let queue = self.inner.borrow();
                queue
                    .timers
                    .values()
                    .map(|entry| entry.deadline)
                    .min()
            };
            match next_deadline {
                Some(deadline) => {
                    let now = self.now();
                    self.advance(deadline.saturating_sub(now));
                }
                None => break,
            }
        }
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (tag, delay) in [("late", 300), ("early", 100), ("mid", 200)] {
            let log = log.clone();
            timers.schedule(ms(delay), move || log.borrow_mut().push(tag));
        }
        timers.advance(ms(300));
        assert_eq!(*log.borrow(), vec!["early", "mid", "late"]);
        assert!(timers.is_idle());
    }

    #[test]
    fn test_deadline_ties_fire_in_registration_order() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = log.clone();
            timers.schedule(ms(100), move || log.borrow_mut().push(tag));
        }
        timers.advance(ms(100));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_partial_advance_leaves_later_timers() {
        let timers = TimerQueue::new();
        let fired = Rc::new(Cell::new(0));

        for delay in [100, 200, 300] {
            let fired = fired.clone();
            timers.schedule(ms(delay), move || fired.set(fired.get() + 1));
        }
        timers.advance(ms(150));
        assert_eq!(fired.get(), 1);
        assert_eq!(timers.pending(), 2);
        assert_eq!(timers.now(), ms(150));
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let timers = TimerQueue::new();
        let fired = Rc::new(Cell::new(false));

        let probe = fired.clone();
        let id = timers.schedule(ms(100), move || probe.set(true));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));

        timers.advance(ms(200));
        assert!(!fired.get());
    }

    #[test]
    fn test_nested_schedule_fires_within_same_advance() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_timers = timers.clone();
        let outer_log = log.clone();
        timers.schedule(ms(100), move || {
            outer_log.borrow_mut().push("outer");
            let inner_log = outer_log.clone();
            inner_timers.schedule(ms(50), move || inner_log.borrow_mut().push("inner"));
        });

        timers.advance(ms(200));
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
        assert_eq!(timers.now(), ms(200));
    }

    #[test]
    fn test_nested_schedule_beyond_window_waits() {
        let timers = TimerQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_timers = timers.clone();
        let outer_log = log.clone();
        timers.schedule(ms(100), move || {
            outer_log.borrow_mut().push("outer");
            let inner_log = outer_log.clone();
            inner_timers.schedule(ms(500), move || inner_log.borrow_mut().push("inner"));
        });

        timers.advance(ms(200));
        assert_eq!(*log.borrow(), vec!["outer"]);
        timers.advance(ms(400));
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_run_until_idle_drains_chains() {
        let timers = TimerQueue::new();
        let fired = Rc::new(Cell::new(0));

        let inner_timers = timers.clone();
        let probe = fired.clone();
        timers.schedule(ms(100), move || {
            probe.set(probe.get() + 1);
            let probe = probe.clone();
            inner_timers.schedule(ms(100), move || probe.set(probe.get() + 1));
        });

        timers.run_until_idle();
        assert_eq!(fired.get(), 2);
        assert!(timers.is_idle());
    }
}
