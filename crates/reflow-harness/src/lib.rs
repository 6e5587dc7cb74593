#![forbid(unsafe_code)]

//! Test harness for the reflow batcher.
//!
//! Two capabilities tests need that production hosts don't:
//!
//! - **Settling detection.** [`CountingWaiter`] implements the core's
//!   [`Waiter`](reflow_core::Waiter) seam by tracking outstanding tokens;
//!   [`WaiterRegistry`] groups named waiters and answers "has everything
//!   drained?" across all of them, naming whatever is still pending.
//! - **Deterministic time.** [`ManualScheduler`] implements
//!   [`FlushScheduler`](reflow_core::FlushScheduler) by parking scheduled
//!   flushes until the test fires them, so coalescing and re-arm behavior
//!   can be asserted cycle by cycle.
//!
//! ```
//! use reflow_core::Batcher;
//! use reflow_harness::{ManualScheduler, WaiterRegistry};
//! use std::rc::Rc;
//!
//! let registry = WaiterRegistry::new();
//! let scheduler = ManualScheduler::new();
//! let batcher = Batcher::with_waiters(
//!     scheduler.clone(),
//!     Rc::new(registry.build_waiter("reflow: read")),
//!     Rc::new(registry.build_waiter("reflow: mutate")),
//! );
//!
//! batcher.enqueue_read(|| {});
//! assert!(!registry.settled());
//! assert_eq!(registry.pending_names(), ["reflow: read"]);
//!
//! scheduler.fire_all();
//! assert!(registry.settled());
//! ```

pub mod scheduler;
pub mod waiter;

pub use scheduler::ManualScheduler;
pub use waiter::{CountingWaiter, WaiterRegistry};
