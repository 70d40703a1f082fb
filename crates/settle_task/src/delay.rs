//! Time-backed cells: delay and deadline wrapping
//!
//! Thin composition over the core cell contract and the [`TimerQueue`]:
//! no state machine of its own, just wiring.

use std::time::Duration;

use settle_core::{DeferredCell, Reason};

use crate::timer::TimerQueue;

/// A cell that fulfills with `value` once `after` has elapsed on `timers`.
pub fn delay<T>(timers: &TimerQueue, after: Duration, value: T) -> DeferredCell<T>
where
    T: Clone + 'static,
{
    let timers = timers.clone();
    DeferredCell::new(move |settler| {
        timers.schedule(after, move || settler.fulfill(value));
        Ok(())
    })
}

/// Race `inner` against a deadline.
///
/// The result adopts `inner`'s outcome if it settles within `after`;
/// otherwise it rejects with [`Reason::TimedOut`]. The deadline timer is
/// left to fire either way - a late firing lands on an already-settled
/// cell and is ignored.
pub fn timeout<T>(timers: &TimerQueue, inner: DeferredCell<T>, after: Duration) -> DeferredCell<T>
where
    T: Clone + 'static,
{
    let timers = timers.clone();
    DeferredCell::new(move |settler| {
        let on_deadline = settler.clone();
        timers.schedule(after, move || on_deadline.reject(Reason::TimedOut));

        let on_ok = settler.clone();
        let on_err = settler;
        inner.subscribe(
            move |value| on_ok.fulfill(value),
            move |reason| on_err.reject(reason),
        );
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use settle_core::CellState;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_delay_fulfills_only_after_deadline() {
        let timers = TimerQueue::new();
        let cell = delay(&timers, ms(100), 42);

        assert_eq!(cell.state(), CellState::Pending);
        timers.advance(ms(50));
        assert_eq!(cell.state(), CellState::Pending);
        timers.advance(ms(50));
        assert_eq!(cell.try_value(), Some(42));
    }

    #[test]
    fn test_timeout_adopts_inner_value_when_fast_enough() {
        let timers = TimerQueue::new();
        let inner = delay(&timers, ms(100), "data");
        let wrapped = timeout(&timers, inner, ms(500));

        timers.advance(ms(100));
        assert_eq!(wrapped.try_value(), Some("data"));

        // The stale deadline fires into a settled cell and changes nothing.
        timers.advance(ms(400));
        assert_eq!(wrapped.try_value(), Some("data"));
    }

    #[test]
    fn test_timeout_rejects_when_deadline_wins() {
        let timers = TimerQueue::new();
        let inner = delay(&timers, ms(500), "late");
        let wrapped = timeout(&timers, inner, ms(100));

        timers.advance(ms(100));
        assert_eq!(wrapped.try_reason(), Some(Reason::TimedOut));

        // The inner cell still settles for its own consumers.
        timers.advance(ms(400));
        assert_eq!(wrapped.try_reason(), Some(Reason::TimedOut));
    }

    #[test]
    fn test_timeout_passes_inner_rejection_through() {
        let timers = TimerQueue::new();
        let inner = DeferredCell::<i32>::rejected("broken");
        let wrapped = timeout(&timers, inner, ms(100));

        assert_eq!(wrapped.try_reason(), Some(Reason::msg("broken")));
    }

    #[test]
    fn test_timeout_of_never_settling_cell() {
        let timers = TimerQueue::new();
        let (inner, _settler) = DeferredCell::<i32>::pending();
        let wrapped = timeout(&timers, inner, ms(250));

        timers.advance(ms(249));
        assert_eq!(wrapped.state(), CellState::Pending);
        timers.advance(ms(1));
        assert_eq!(wrapped.try_reason(), Some(Reason::TimedOut));
    }
}
