//! Fan-in combinators
//!
//! Four aggregation policies over an ordered collection of cells, each built
//! purely on the public cell contract: [`all`] (wait for every fulfillment),
//! [`race`] (first settlement wins), [`any`] (first fulfillment wins, total
//! failure aggregates), and [`all_settled`] (wait for every settlement).
//!
//! Output ordering is always *input index order*, never completion order.
//! "First" means first in callback-invocation order under the cooperative
//! model: registration order for already-settled inputs, firing order for
//! deferred ones.
//!
//! Empty collections settle immediately with their vacuous outcome
//! (`all`/`all_settled` fulfill empty, `any` rejects an empty aggregate)
//! rather than hanging; `race` over nothing never settles.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::{DeferredCell, Settler};
use crate::reason::Reason;

/// One input's settlement record, as reported by [`all_settled`].
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Fulfilled { value: T },
    Rejected { reason: Reason },
}

impl<T> Outcome<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Outcome::Fulfilled { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected { .. })
    }
}

/// Slot bookkeeping shared by the index-ordered combinators.
struct Gather<S> {
    slots: Vec<Option<S>>,
    done: usize,
}

impl<S> Gather<S> {
    fn new(total: usize) -> Rc<RefCell<Self>> {
        let mut slots = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        Rc::new(RefCell::new(Self { slots, done: 0 }))
    }

    /// Record one settlement; returns the full ordered set once complete.
    fn record(&mut self, index: usize, entry: S) -> Option<Vec<S>> {
        self.slots[index] = Some(entry);
        self.done += 1;
        if self.done == self.slots.len() {
            Some(self.slots.iter_mut().filter_map(Option::take).collect())
        } else {
            None
        }
    }
}

/// Fulfills with every input's value in input index order once all inputs
/// fulfill; rejects with the first rejection in settlement order.
pub fn all<T, I>(cells: I) -> DeferredCell<Vec<T>>
where
    T: Clone + 'static,
    I: IntoIterator<Item = DeferredCell<T>>,
{
    let cells: Vec<DeferredCell<T>> = cells.into_iter().collect();
    DeferredCell::new(move |settler| {
        if cells.is_empty() {
            settler.fulfill(Vec::new());
            return Ok(());
        }
        let gather = Gather::new(cells.len());
        for (index, cell) in cells.into_iter().enumerate() {
            let gather = Rc::clone(&gather);
            let on_ok: Settler<Vec<T>> = settler.clone();
            let on_err = settler.clone();
            cell.subscribe(
                move |value| {
                    let complete = gather.borrow_mut().record(index, value);
                    if let Some(values) = complete {
                        on_ok.fulfill(values);
                    }
                },
                move |reason| on_err.reject(reason),
            );
        }
        Ok(())
    })
}

/// Settles to whichever input settles first, fulfilled or rejected.
///
/// Over an empty collection the result never settles.
pub fn race<T, I>(cells: I) -> DeferredCell<T>
where
    T: Clone + 'static,
    I: IntoIterator<Item = DeferredCell<T>>,
{
    let cells: Vec<DeferredCell<T>> = cells.into_iter().collect();
    DeferredCell::new(move |settler| {
        for cell in cells {
            let on_ok = settler.clone();
            let on_err = settler.clone();
            cell.subscribe(
                move |value| on_ok.fulfill(value),
                move |reason| on_err.reject(reason),
            );
        }
        Ok(())
    })
}

/// Fulfills with the first input to fulfill; rejects with
/// [`Reason::Aggregate`] of every reason (input index order) only when every
/// input rejects.
pub fn any<T, I>(cells: I) -> DeferredCell<T>
where
    T: Clone + 'static,
    I: IntoIterator<Item = DeferredCell<T>>,
{
    let cells: Vec<DeferredCell<T>> = cells.into_iter().collect();
    DeferredCell::new(move |settler| {
        if cells.is_empty() {
            settler.reject(Reason::Aggregate(Vec::new()));
            return Ok(());
        }
        let gather = Gather::new(cells.len());
        for (index, cell) in cells.into_iter().enumerate() {
            let gather = Rc::clone(&gather);
            let on_ok = settler.clone();
            let on_err = settler.clone();
            cell.subscribe(
                move |value| on_ok.fulfill(value),
                move |reason| {
                    let complete = gather.borrow_mut().record(index, reason);
                    if let Some(reasons) = complete {
                        on_err.reject(Reason::Aggregate(reasons));
                    }
                },
            );
        }
        Ok(())
    })
}

/// Always fulfills, once every input has settled, with one [`Outcome`]
/// record per input in input index order.
pub fn all_settled<T, I>(cells: I) -> DeferredCell<Vec<Outcome<T>>>
where
    T: Clone + 'static,
    I: IntoIterator<Item = DeferredCell<T>>,
{
    let cells: Vec<DeferredCell<T>> = cells.into_iter().collect();
    DeferredCell::new(move |settler| {
        if cells.is_empty() {
            settler.fulfill(Vec::new());
            return Ok(());
        }
        let gather = Gather::new(cells.len());
        for (index, cell) in cells.into_iter().enumerate() {
            let gather_ok = Rc::clone(&gather);
            let gather_err = Rc::clone(&gather);
            let on_ok = settler.clone();
            let on_err = settler.clone();
            cell.subscribe(
                move |value| {
                    let complete = gather_ok
                        .borrow_mut()
                        .record(index, Outcome::Fulfilled { value });
                    if let Some(outcomes) = complete {
                        on_ok.fulfill(outcomes);
                    }
                },
                move |reason| {
                    let complete = gather_err
                        .borrow_mut()
                        .record(index, Outcome::Rejected { reason });
                    if let Some(outcomes) = complete {
                        on_err.fulfill(outcomes);
                    }
                },
            );
        }
        Ok(())
    })
}
