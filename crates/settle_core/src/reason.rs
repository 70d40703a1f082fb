//! Rejection reasons
//!
//! A settled-as-rejected cell carries a [`Reason`]. The original contract
//! allows any value as a reason, so the enum closes over the shapes the
//! library itself produces (messages, timeouts, aggregates) and keeps a
//! type-erased `Opaque` variant as the escape hatch for arbitrary payloads.
//!
//! Reasons are single-threaded (`Rc`) and cheap to clone, matching the
//! cooperative execution model of the cells that carry them.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Why a cell rejected.
#[derive(Clone, Error)]
pub enum Reason {
    /// A human-readable rejection message.
    #[error("{0}")]
    Message(String),

    /// The fixed reason produced when a deadline beats the inner cell.
    #[error("timeout expired")]
    TimedOut,

    /// Every input of `any()` rejected; reasons are in input index order.
    #[error("all cells rejected ({} reasons)", .0.len())]
    Aggregate(Vec<Reason>),

    /// An arbitrary type-erased payload.
    #[error("opaque rejection payload")]
    Opaque(Rc<dyn Any>),
}

impl Reason {
    /// Build a message reason.
    pub fn msg(text: impl Into<String>) -> Self {
        Reason::Message(text.into())
    }

    /// Type-erase an arbitrary value into a reason.
    pub fn opaque<V: 'static>(value: V) -> Self {
        Reason::Opaque(Rc::new(value))
    }

    /// Borrow the payload of an `Opaque` reason as a concrete type.
    pub fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        match self {
            Reason::Opaque(payload) => payload.downcast_ref::<V>(),
            _ => None,
        }
    }

    /// The aggregated reasons, if this is an `Aggregate`.
    pub fn reasons(&self) -> Option<&[Reason]> {
        match self {
            Reason::Aggregate(reasons) => Some(reasons),
            _ => None,
        }
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Message(text) => f.debug_tuple("Message").field(text).finish(),
            Reason::TimedOut => f.write_str("TimedOut"),
            Reason::Aggregate(reasons) => f.debug_tuple("Aggregate").field(reasons).finish(),
            Reason::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl PartialEq for Reason {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Reason::Message(a), Reason::Message(b)) => a == b,
            (Reason::TimedOut, Reason::TimedOut) => true,
            (Reason::Aggregate(a), Reason::Aggregate(b)) => a == b,
            // Opaque payloads have no general equality; identity is the
            // strongest comparison available.
            (Reason::Opaque(a), Reason::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Reason {
    fn from(text: &str) -> Self {
        Reason::msg(text)
    }
}

impl From<String> for Reason {
    fn from(text: String) -> Self {
        Reason::Message(text)
    }
}
