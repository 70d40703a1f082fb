//! Legacy callback adapter
//!
//! Bridges err-first callback APIs onto deferred cells: the wrapped function
//! receives a [`LegacyCallback`] instead of a bare closure, and the cell
//! rejects when the error slot is populated, fulfills otherwise.

use settle_core::{DeferredCell, Reason, Settler};

/// The completion handle passed into a wrapped legacy function.
///
/// Single-shot by construction: completing consumes the handle.
pub struct LegacyCallback<T> {
    settler: Settler<T>,
}

impl<T: Clone + 'static> LegacyCallback<T> {
    /// Err-first completion: a present error rejects, otherwise the result
    /// fulfills. Completing with neither is a caller bug and rejects with a
    /// message reason rather than leaving the cell pending forever.
    pub fn complete(self, err: Option<Reason>, result: Option<T>) {
        match (err, result) {
            (Some(reason), _) => self.settler.reject(reason),
            (None, Some(value)) => self.settler.fulfill(value),
            (None, None) => self
                .settler
                .reject(Reason::msg("legacy callback completed without a result")),
        }
    }

    /// Shorthand for a successful completion.
    pub fn ok(self, value: T) {
        self.complete(None, Some(value));
    }

    /// Shorthand for a failed completion.
    pub fn fail(self, reason: Reason) {
        self.complete(Some(reason), None);
    }
}

/// Run a legacy callback-style function once and observe its completion as
/// a cell.
pub fn from_callback<T, F>(register: F) -> DeferredCell<T>
where
    T: Clone + 'static,
    F: FnOnce(LegacyCallback<T>),
{
    DeferredCell::new(move |settler| {
        register(LegacyCallback { settler });
        Ok(())
    })
}

/// Lift a legacy callback-style function into one returning a cell.
///
/// Variadic argument lists collapse into a single `Args` value (use a tuple
/// for more than one argument).
pub fn promisify<Args, T, F>(f: F) -> impl Fn(Args) -> DeferredCell<T>
where
    T: Clone + 'static,
    F: Fn(Args, LegacyCallback<T>),
{
    move |args| from_callback(|callback| f(args, callback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use settle_core::CellState;

    use crate::timer::TimerQueue;

    #[test]
    fn test_ok_completion_fulfills() {
        let cell = from_callback(|callback: LegacyCallback<i32>| callback.ok(42));
        assert_eq!(cell.try_value(), Some(42));
    }

    #[test]
    fn test_err_completion_rejects() {
        let cell = from_callback(|callback: LegacyCallback<i32>| {
            callback.complete(Some(Reason::msg("enoent")), Some(7))
        });
        assert_eq!(cell.try_reason(), Some(Reason::msg("enoent")));
    }

    #[test]
    fn test_empty_completion_rejects_instead_of_hanging() {
        let cell = from_callback(|callback: LegacyCallback<i32>| callback.complete(None, None));
        assert_eq!(
            cell.try_reason(),
            Some(Reason::msg("legacy callback completed without a result"))
        );
    }

    #[test]
    fn test_deferred_completion_settles_later() {
        let timers = TimerQueue::new();
        let pending_callback = Rc::new(RefCell::new(None));

        let stash = pending_callback.clone();
        let cell = from_callback(move |callback: LegacyCallback<&'static str>| {
            *stash.borrow_mut() = Some(callback);
        });
        assert_eq!(cell.state(), CellState::Pending);

        timers.schedule(Duration::from_millis(100), move || {
            if let Some(callback) = pending_callback.borrow_mut().take() {
                callback.ok("done");
            }
        });
        timers.advance(Duration::from_millis(100));
        assert_eq!(cell.try_value(), Some("done"));
    }

    #[test]
    fn test_promisify_wraps_arguments() {
        let parse = promisify(|text: &str, callback: LegacyCallback<i32>| {
            match text.parse::<i32>() {
                Ok(number) => callback.ok(number),
                Err(err) => callback.fail(Reason::msg(err.to_string())),
            }
        });

        assert_eq!(parse("123").try_value(), Some(123));
        assert_eq!(parse("nope").state(), CellState::Rejected);
    }
}
