#![forbid(unsafe_code)]

//! Settling instrumentation seam.
//!
//! Every queued task is bracketed by a [`Waiter`]: [`Waiter::begin_async`]
//! when the task is enqueued, [`Waiter::end_async`] after it executes. The
//! pairing lets an external test harness detect when all batched work has
//! drained. Waiters have no effect on scheduling.
//!
//! # Invariants
//!
//! 1. `end_async` is called exactly once per token handed out for a task
//!    that ran, on every exit path (including panic isolation).
//! 2. Tokens are opaque; only the waiter that issued a token can interpret
//!    it.
//!
//! The counting implementation used by tests lives in `reflow-harness`;
//! production hosts that don't care about settling use [`NoopWaiter`].

/// Opaque handle for one pending task, issued by [`Waiter::begin_async`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterToken(u64);

impl WaiterToken {
    /// Build a token from a raw id. Intended for `Waiter` implementations.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id this token was built from.
    #[must_use]
    pub fn into_raw(self) -> u64 {
        self.0
    }
}

/// Brackets the pending lifetime of queued tasks for external settling
/// detection.
pub trait Waiter {
    /// Record that a task has been queued; returns the handle to release
    /// once it has run.
    fn begin_async(&self) -> WaiterToken;

    /// Release a handle returned by [`begin_async`](Self::begin_async).
    fn end_async(&self, token: WaiterToken);
}

/// Waiter that tracks nothing. The default when settling detection is not
/// wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWaiter;

impl Waiter for NoopWaiter {
    fn begin_async(&self) -> WaiterToken {
        WaiterToken(0)
    }

    fn end_async(&self, _token: WaiterToken) {}
}
