//! Settle-once deferred cells
//!
//! A [`DeferredCell<T>`] is a single-threaded, cooperative deferred value:
//! it starts `Pending`, settles exactly once to `Fulfilled(T)` or
//! `Rejected(Reason)`, and never reverts. Continuations attached while
//! pending are queued and invoked in registration order at the moment of
//! settlement; continuations attached after settlement run synchronously at
//! registration time, before the attaching call returns.
//!
//! Settlement rights live in the [`Settler<T>`] capability handed to the
//! executor at construction. Resolving with another cell does not settle
//! immediately - the cell subscribes to the inner cell and adopts whichever
//! terminal state it eventually reaches, so arbitrarily deep nesting unwinds
//! by subscription rather than by recursion.
//!
//! # Example
//!
//! ```rust
//! use settle_core::{DeferredCell, Resolution};
//!
//! let cell = DeferredCell::resolved(2);
//! let doubled = cell.then(|value| Ok(Resolution::Value(value * 2)));
//! assert_eq!(doubled.try_value(), Some(4));
//! ```

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::reason::Reason;

/// What a handler (or executor) hands back to settle a downstream cell.
pub type SettleResult<T> = Result<Resolution<T>, Reason>;

/// A fulfillment outcome: either a plain value or another cell to adopt.
#[derive(Clone)]
pub enum Resolution<T> {
    /// Settle with this value directly.
    Value(T),
    /// Defer settlement to another cell's eventual outcome.
    Chain(DeferredCell<T>),
}

impl<T> From<DeferredCell<T>> for Resolution<T> {
    fn from(cell: DeferredCell<T>) -> Self {
        Resolution::Chain(cell)
    }
}

/// Observable lifecycle state of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Pending,
    Fulfilled,
    Rejected,
}

/// Stored outcome; the state tag and the settled payload are one tagged union
/// so a settled cell can never be missing its value.
enum Stored<T> {
    Pending,
    Fulfilled(T),
    Rejected(Reason),
}

type FulfillHandler<T> = Box<dyn FnOnce(T)>;
type RejectHandler = Box<dyn FnOnce(Reason)>;

struct CellInner<T> {
    state: Stored<T>,
    /// Append-only while pending; drained and discarded at settlement.
    on_fulfilled: SmallVec<[FulfillHandler<T>; 2]>,
    on_rejected: SmallVec<[RejectHandler; 2]>,
}

/// A settle-once deferred value (cheap to clone; clones share the cell).
pub struct DeferredCell<T> {
    inner: Rc<RefCell<CellInner<T>>>,
}

impl<T> Clone for DeferredCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// The capability to settle one cell. Clonable and reusable; every attempt
/// after the first settlement is a no-op.
pub struct Settler<T> {
    inner: Rc<RefCell<CellInner<T>>>,
}

impl<T> Clone for Settler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> DeferredCell<T> {
    /// Create a cell and run `executor` synchronously with its settler.
    ///
    /// An `Err` returned by the executor rejects the cell, so a failing
    /// executor can never leave an error unobserved.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Settler<T>) -> Result<(), Reason>,
    {
        let inner = Rc::new(RefCell::new(CellInner {
            state: Stored::Pending,
            on_fulfilled: SmallVec::new(),
            on_rejected: SmallVec::new(),
        }));
        let settler = Settler {
            inner: Rc::clone(&inner),
        };
        if let Err(reason) = executor(settler.clone()) {
            settler.reject(reason);
        }
        Self { inner }
    }

    /// A cell already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        Self::new(move |settler| {
            settler.fulfill(value);
            Ok(())
        })
    }

    /// A cell that adopts `source`'s eventual outcome.
    pub fn resolved_from(source: DeferredCell<T>) -> Self {
        Self::new(move |settler| {
            settler.fulfill_from(source);
            Ok(())
        })
    }

    /// A cell already rejected with `reason`.
    pub fn rejected(reason: impl Into<Reason>) -> Self {
        Self::new(move |settler| {
            settler.reject(reason.into());
            Ok(())
        })
    }

    /// A cell that rejects with whatever `source` eventually produces,
    /// fulfillment value and rejection reason alike.
    pub fn rejected_from(source: DeferredCell<T>) -> Self {
        Self::new(move |settler| {
            settler.reject_from(source);
            Ok(())
        })
    }

    /// A pending cell together with its settler, as a producer/consumer pair.
    pub fn pending() -> (Self, Settler<T>) {
        let cell = Self::new(|_| Ok(()));
        let settler = Settler {
            inner: Rc::clone(&cell.inner),
        };
        (cell, settler)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CellState {
        match self.inner.borrow().state {
            Stored::Pending => CellState::Pending,
            Stored::Fulfilled(_) => CellState::Fulfilled,
            Stored::Rejected(_) => CellState::Rejected,
        }
    }

    /// The fulfillment value, if already fulfilled.
    pub fn try_value(&self) -> Option<T> {
        match &self.inner.borrow().state {
            Stored::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection reason, if already rejected.
    pub fn try_reason(&self) -> Option<Reason> {
        match &self.inner.borrow().state {
            Stored::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Attach raw continuations without allocating a downstream cell.
    ///
    /// While pending, both continuations are queued (in registration order).
    /// On an already-settled cell the matching continuation runs
    /// synchronously, before this call returns.
    pub fn subscribe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + 'static,
        R: FnOnce(Reason) + 'static,
    {
        let settled = {
            let cell = self.inner.borrow();
            match &cell.state {
                Stored::Pending => None,
                Stored::Fulfilled(value) => Some(Ok(value.clone())),
                Stored::Rejected(reason) => Some(Err(reason.clone())),
            }
        };
        match settled {
            None => {
                let mut cell = self.inner.borrow_mut();
                cell.on_fulfilled.push(Box::new(on_fulfilled));
                cell.on_rejected.push(Box::new(on_rejected));
            }
            Some(Ok(value)) => on_fulfilled(value),
            Some(Err(reason)) => on_rejected(reason),
        }
    }

    /// Chain a fulfillment continuation; rejections pass through unchanged.
    ///
    /// The callback's `Ok` becomes the downstream cell's resolution (which
    /// may itself be another cell); an `Err` rejects the downstream cell.
    pub fn then<U, F>(&self, on_fulfilled: F) -> DeferredCell<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> SettleResult<U> + 'static,
    {
        let this = self.clone();
        DeferredCell::new(move |settler| {
            let on_ok = settler.clone();
            let on_err = settler;
            this.subscribe(
                move |value| match on_fulfilled(value) {
                    Ok(resolution) => on_ok.resolve(resolution),
                    Err(reason) => on_ok.reject(reason),
                },
                move |reason| on_err.reject(reason),
            );
            Ok(())
        })
    }

    /// Chain continuations for both outcomes.
    ///
    /// A rejection handler that returns `Ok` recovers: the downstream cell
    /// fulfills with the handler's resolution rather than staying rejected.
    pub fn then_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> DeferredCell<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> SettleResult<U> + 'static,
        R: FnOnce(Reason) -> SettleResult<U> + 'static,
    {
        let this = self.clone();
        DeferredCell::new(move |settler| {
            let on_ok = settler.clone();
            let on_err = settler;
            this.subscribe(
                move |value| match on_fulfilled(value) {
                    Ok(resolution) => on_ok.resolve(resolution),
                    Err(reason) => on_ok.reject(reason),
                },
                move |reason| match on_rejected(reason) {
                    Ok(resolution) => on_err.resolve(resolution),
                    Err(reason) => on_err.reject(reason),
                },
            );
            Ok(())
        })
    }

    /// Chain a rejection continuation; fulfillment values pass through.
    ///
    /// A handler that returns `Ok` converts the chain back to fulfilled.
    pub fn catch<R>(&self, on_rejected: R) -> DeferredCell<T>
    where
        R: FnOnce(Reason) -> SettleResult<T> + 'static,
    {
        let this = self.clone();
        DeferredCell::new(move |settler| {
            let on_ok = settler.clone();
            let on_err = settler;
            this.subscribe(
                move |value| on_ok.fulfill(value),
                move |reason| match on_rejected(reason) {
                    Ok(resolution) => on_err.resolve(resolution),
                    Err(reason) => on_err.reject(reason),
                },
            );
            Ok(())
        })
    }

    /// Chain a callback that observes fulfillment only.
    ///
    /// The downstream cell fulfills with the callback's resolution. This is
    /// deliberately asymmetric: a rejection of the receiver is not observed,
    /// and the downstream cell then never settles.
    pub fn finally<U, F>(&self, on_finally: F) -> DeferredCell<U>
    where
        U: Clone + 'static,
        F: FnOnce() -> SettleResult<U> + 'static,
    {
        let this = self.clone();
        DeferredCell::new(move |settler| {
            this.subscribe(
                move |_value| match on_finally() {
                    Ok(resolution) => settler.resolve(resolution),
                    Err(reason) => settler.reject(reason),
                },
                |_reason| {},
            );
            Ok(())
        })
    }
}

impl<T: Clone + 'static> Settler<T> {
    /// Fulfill the cell with a plain value. No-op once settled.
    pub fn fulfill(&self, value: T) {
        let handlers = {
            let mut cell = self.inner.borrow_mut();
            if !matches!(cell.state, Stored::Pending) {
                tracing::trace!("ignoring fulfill on settled cell");
                return;
            }
            cell.state = Stored::Fulfilled(value.clone());
            cell.on_rejected.clear();
            mem::take(&mut cell.on_fulfilled)
        };
        for handler in handlers {
            handler(value.clone());
        }
    }

    /// Reject the cell with a reason. No-op once settled.
    pub fn reject(&self, reason: Reason) {
        let handlers = {
            let mut cell = self.inner.borrow_mut();
            if !matches!(cell.state, Stored::Pending) {
                tracing::trace!("ignoring reject on settled cell");
                return;
            }
            cell.state = Stored::Rejected(reason.clone());
            cell.on_fulfilled.clear();
            mem::take(&mut cell.on_rejected)
        };
        for handler in handlers {
            handler(reason.clone());
        }
    }

    /// Adopt another cell: this cell settles to whatever terminal state
    /// `source` reaches. A rejected source always rejects this cell.
    pub fn fulfill_from(&self, source: DeferredCell<T>) {
        if !self.is_pending() {
            return;
        }
        let on_ok = self.clone();
        let on_err = self.clone();
        source.subscribe(
            move |value| on_ok.fulfill(value),
            move |reason| on_err.reject(reason),
        );
    }

    /// Reject with whatever `source` eventually produces: a fulfillment
    /// value is type-erased into the reason, a rejection reason passes
    /// through unchanged. Both branches funnel into rejection.
    pub fn reject_from(&self, source: DeferredCell<T>) {
        if !self.is_pending() {
            return;
        }
        let on_ok = self.clone();
        let on_err = self.clone();
        source.subscribe(
            move |value| on_ok.reject(Reason::opaque(value)),
            move |reason| on_err.reject(reason),
        );
    }

    /// Dispatch a [`Resolution`] to the matching settle path.
    pub fn resolve(&self, resolution: Resolution<T>) {
        match resolution {
            Resolution::Value(value) => self.fulfill(value),
            Resolution::Chain(cell) => self.fulfill_from(cell),
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, Stored::Pending)
    }
}
