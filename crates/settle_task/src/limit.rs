//! Bounded-concurrency driver
//!
//! Runs a sequence of deferred-producing functions with at most `limit` in
//! flight at once. Producers start in input order; each completion pulls the
//! next unstarted producer. The final output keeps input index order, and
//! the first rejection settles the result immediately and stops any further
//! producer from starting.

use std::cell::RefCell;
use std::rc::Rc;

use settle_core::{DeferredCell, Reason, SettleResult, Settler};

/// A unit of deferred work: returns a plain value, a cell to wait on, or an
/// error that rejects the whole run.
pub type Producer<T> = Box<dyn FnOnce() -> SettleResult<T>>;

struct Drive<T> {
    queue: std::vec::IntoIter<Producer<T>>,
    results: Vec<Option<T>>,
    total: usize,
    next_index: usize,
    done: usize,
    failed: bool,
}

/// Run `producers` with at most `limit` in flight; fulfill with every result
/// in input index order, or reject with the first failure.
///
/// An empty input fulfills immediately with an empty vector. A zero `limit`
/// could never start anything, so it rejects instead of hanging.
pub fn run_limited<T>(producers: Vec<Producer<T>>, limit: usize) -> DeferredCell<Vec<T>>
where
    T: Clone + 'static,
{
    DeferredCell::new(move |settler| {
        if limit == 0 {
            settler.reject(Reason::msg("concurrency limit must be at least 1"));
            return Ok(());
        }
        let total = producers.len();
        if total == 0 {
            settler.fulfill(Vec::new());
            return Ok(());
        }
        let mut results = Vec::with_capacity(total);
        results.resize_with(total, || None);
        let drive = Rc::new(RefCell::new(Drive {
            queue: producers.into_iter(),
            results,
            total,
            next_index: 0,
            done: 0,
            failed: false,
        }));
        for _ in 0..limit {
            start_next(&drive, &settler);
        }
        Ok(())
    })
}

/// Pull the next unstarted producer, run it, and wire its settlement back
/// into the shared drive state.
fn start_next<T>(drive: &Rc<RefCell<Drive<T>>>, settler: &Settler<Vec<T>>)
where
    T: Clone + 'static,
{
    let (producer, index) = {
        let mut state = drive.borrow_mut();
        if state.failed {
            return;
        }
        match state.queue.next() {
            Some(producer) => {
                let index = state.next_index;
                state.next_index += 1;
                (producer, index)
            }
            None => return,
        }
    };

    let cell = DeferredCell::new(|cell_settler| {
        match producer() {
            Ok(resolution) => cell_settler.resolve(resolution),
            Err(reason) => cell_settler.reject(reason),
        }
        Ok(())
    });

    let drive_ok = Rc::clone(drive);
    let settler_ok = settler.clone();
    let drive_err = Rc::clone(drive);
    let settler_err = settler.clone();
    cell.subscribe(
        move |value| {
            let finished = {
                let mut state = drive_ok.borrow_mut();
                state.results[index] = Some(value);
                state.done += 1;
                state.done == state.total
            };
            if finished {
                let values = {
                    let mut state = drive_ok.borrow_mut();
                    state.results.iter_mut().filter_map(Option::take).collect()
                };
                settler_ok.fulfill(values);
            } else {
                start_next(&drive_ok, &settler_ok);
            }
        },
        move |reason| {
            drive_err.borrow_mut().failed = true;
            settler_err.reject(reason);
        },
    );
}
