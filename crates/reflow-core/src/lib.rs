#![forbid(unsafe_code)]

//! Two-phase read/mutate batching for layout-sensitive hosts.
//!
//! Interleaving surface reads (measure) with surface mutations (write) forces
//! the host to recompute layout between every pair — the classic layout
//! thrashing pattern. This crate batches both kinds of work into two ordered
//! queues and drains them once per animation frame (or macrotask fallback):
//! all queued reads first, then all queued mutations.
//!
//! - [`Batcher`]: owns the two queues, the running flag, and the injected
//!   scheduling strategy. [`Batcher::enqueue_read`] and
//!   [`Batcher::enqueue_mutate`] are the whole public surface.
//! - [`FlushScheduler`]: the injected "run this at the next opportunity"
//!   capability. [`RacedScheduler`] races a frame callback against a short
//!   fallback timer; [`DeferredScheduler`] wraps a plain macrotask primitive.
//! - [`Waiter`]: observability seam bracketing each queued task's pending
//!   lifetime, so external harnesses can detect when async work has settled.
//! - [`visibility_advisory`]: debug-oriented check that warns when batched
//!   work is queued while the host reports itself hidden.
//!
//! # Architecture
//!
//! `Batcher` is a cheap-to-clone handle over `Rc` state; everything runs on
//! one logical thread, cooperating with the host event loop. The only
//! suspension point is between requesting a flush and the scheduling
//! primitive firing. Strategy selection (frame-timing vs. macrotask) belongs
//! to the host integration layer — the core never inspects its environment.
//!
//! # Invariants
//!
//! 1. At most one flush cycle is in flight at any time.
//! 2. Every enqueued task executes exactly once, never dropped, never
//!    duplicated (short of process exit).
//! 3. Within one flush cycle, every queued read runs before any queued
//!    mutation.
//! 4. Within a phase, execution is LIFO: the most recently enqueued task
//!    runs first. This is an observable contract, not an accident.
//! 5. A task's waiter token is released after the task runs, on every path,
//!    including panic isolation.
//!
//! # Example
//!
//! ```
//! use reflow_core::Batcher;
//! use reflow_harness::ManualScheduler;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let scheduler = ManualScheduler::new();
//! let batcher = Batcher::new(scheduler.clone());
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let l = Rc::clone(&log);
//! batcher.enqueue_mutate(move || l.borrow_mut().push("mutate"));
//! let l = Rc::clone(&log);
//! batcher.enqueue_read(move || l.borrow_mut().push("read"));
//!
//! // Many enqueues, one scheduled flush.
//! assert_eq!(scheduler.pending(), 1);
//!
//! scheduler.fire_all();
//! assert_eq!(*log.borrow(), ["read", "mutate"]);
//! ```

pub mod batcher;
pub mod schedule;
pub mod visibility;
pub mod waiter;

pub use batcher::Batcher;
pub use schedule::{
    DEFAULT_FALLBACK_DELAY, DeferredScheduler, FlushScheduler, FramePrimitive, RacedScheduler,
    TimerPrimitive,
};
pub use visibility::{HiddenEnvironmentError, visibility_advisory};
pub use waiter::{NoopWaiter, Waiter, WaiterToken};
