//! Settle Core Runtime
//!
//! This crate provides the foundational primitives for the Settle toolkit:
//!
//! - **Deferred Cells**: settle-once deferred values with chainable
//!   continuations (`then`/`then_else`/`catch`/`finally`) and nested-cell
//!   adoption
//! - **Rejection Reasons**: a closed error enum with a type-erased escape
//!   hatch for arbitrary payloads
//! - **Combinators**: the four fan-in aggregation policies (`all`, `race`,
//!   `any`, `all_settled`)
//!
//! Everything here is single-threaded and cooperative: cells never block,
//! never spawn, and settle deterministically in the order continuations are
//! attached and fired.
//!
//! # Example
//!
//! ```rust
//! use settle_core::{all, DeferredCell, Resolution};
//!
//! let cells = vec![
//!     DeferredCell::resolved(1),
//!     DeferredCell::resolved(2),
//!     DeferredCell::resolved(3),
//! ];
//!
//! let sum = all(cells).then(|values| {
//!     Ok(Resolution::Value(values.into_iter().sum::<i32>()))
//! });
//! assert_eq!(sum.try_value(), Some(6));
//! ```

pub mod cell;
pub mod combinators;
pub mod reason;

pub use cell::{CellState, DeferredCell, Resolution, SettleResult, Settler};
pub use combinators::{all, all_settled, any, race, Outcome};
pub use reason::Reason;
