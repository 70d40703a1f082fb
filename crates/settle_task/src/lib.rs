//! Settle Task Peripherals
//!
//! Time- and flow-shaped helpers composed over `settle_core`'s cell
//! contract:
//!
//! - **Timer Queue**: deterministic virtual-time scheduling; time moves only
//!   when the owner advances it
//! - **Delay / Timeout**: a cell that fulfills after a duration, and a
//!   wrapper that races any cell against a deadline
//! - **Bounded Run**: drive a sequence of producers with at most K in flight
//! - **Callback Adapter**: lift err-first legacy callbacks into cells
//!
//! None of these own a state machine beyond what the core cell provides;
//! they are wiring.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use settle_task::{delay, timeout, TimerQueue};
//! use settle_core::Reason;
//!
//! let timers = TimerQueue::new();
//! let slow = delay(&timers, Duration::from_millis(500), "data");
//! let wrapped = timeout(&timers, slow, Duration::from_millis(100));
//!
//! timers.advance(Duration::from_millis(100));
//! assert_eq!(wrapped.try_reason(), Some(Reason::TimedOut));
//! ```

pub mod callback;
pub mod delay;
pub mod limit;
pub mod timer;

pub use callback::{from_callback, promisify, LegacyCallback};
pub use delay::{delay, timeout};
pub use limit::{run_limited, Producer};
pub use timer::{TimerId, TimerQueue};
