#![forbid(unsafe_code)]

//! Scheduling strategies: how a requested flush becomes a callback firing.
//!
//! The batcher never talks to the host's timing APIs directly. It holds a
//! [`FlushScheduler`], and the host integration layer decides once, at
//! construction time, which strategy that is:
//!
//! - [`RacedScheduler`] for hosts with a frame-timing API: each flush is
//!   registered with both the frame primitive and a short fallback timer,
//!   and whichever fires first runs it. Frame callbacks stop firing in
//!   hidden/backgrounded hosts; the timer keeps the queues draining there.
//! - [`DeferredScheduler`] for hosts without frame timing: a plain
//!   "as soon as possible after the current synchronous execution"
//!   primitive.
//!
//! The primitives themselves are injected function values, so the core
//! stays portable and deterministic under test (see `ManualScheduler` in
//! `reflow-harness` for the test-side strategy).
//!
//! # Invariants
//!
//! 1. A scheduled callback runs at most once, even if both racing
//!    primitives fire.
//! 2. The race is decided by a first-writer-wins guard on the same
//!    single-threaded timeline; no locks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

/// Fallback delay for [`RacedScheduler`]: long enough to lose the race to a
/// healthy frame callback (~16ms at 60Hz), short enough to keep work moving
/// when frames stop.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(20);

/// Host capability: register a callback for the next frame opportunity.
pub type FramePrimitive = Rc<dyn Fn(Box<dyn FnOnce()>)>;

/// Host capability: run a callback after a delay.
pub type TimerPrimitive = Rc<dyn Fn(Duration, Box<dyn FnOnce()>)>;

/// Strategy seam between the batcher and the host's timing APIs: run
/// `callback` at the next scheduling opportunity.
pub trait FlushScheduler {
    /// Schedule `callback` to run once, at the next opportunity.
    fn schedule(&self, callback: Box<dyn FnOnce()>);
}

impl<S: FlushScheduler + ?Sized> FlushScheduler for Box<S> {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        (**self).schedule(callback);
    }
}

impl<S: FlushScheduler + ?Sized> FlushScheduler for Rc<S> {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        (**self).schedule(callback);
    }
}

// ---------------------------------------------------------------------------
// RacedScheduler — frame primitive vs. fallback timer
// ---------------------------------------------------------------------------

/// Races a frame-timing primitive against a fallback timer.
///
/// Each `schedule()` call registers the callback with both primitives. The
/// timer checks the guard before acting; the frame callback sets the guard
/// and acts unconditionally. The callback itself lives in a take-once slot,
/// so it runs at most once per cycle no matter how the race resolves.
pub struct RacedScheduler {
    frame: FramePrimitive,
    timer: TimerPrimitive,
    fallback_delay: Duration,
}

impl RacedScheduler {
    /// Race `frame` against `timer` with [`DEFAULT_FALLBACK_DELAY`].
    #[must_use]
    pub fn new(frame: FramePrimitive, timer: TimerPrimitive) -> Self {
        Self::with_fallback_delay(frame, timer, DEFAULT_FALLBACK_DELAY)
    }

    /// Race `frame` against `timer` with a custom fallback delay.
    #[must_use]
    pub fn with_fallback_delay(
        frame: FramePrimitive,
        timer: TimerPrimitive,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            frame,
            timer,
            fallback_delay,
        }
    }
}

impl FlushScheduler for RacedScheduler {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        let slot = Rc::new(RefCell::new(Some(callback)));
        let frame_fired = Rc::new(Cell::new(false));

        let timer_slot = Rc::clone(&slot);
        let timer_guard = Rc::clone(&frame_fired);
        (self.timer)(
            self.fallback_delay,
            Box::new(move || {
                if timer_guard.get() {
                    return;
                }
                let taken = timer_slot.borrow_mut().take();
                if let Some(cb) = taken {
                    trace!("flush fired via fallback timer");
                    cb();
                }
            }),
        );

        (self.frame)(Box::new(move || {
            frame_fired.set(true);
            let taken = slot.borrow_mut().take();
            if let Some(cb) = taken {
                cb();
            }
        }));
    }
}

impl std::fmt::Debug for RacedScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RacedScheduler")
            .field("fallback_delay", &self.fallback_delay)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DeferredScheduler — plain macrotask fallback
// ---------------------------------------------------------------------------

/// Wraps a single "as soon as possible" primitive for hosts without frame
/// timing.
pub struct DeferredScheduler {
    defer: Rc<dyn Fn(Box<dyn FnOnce()>)>,
}

impl DeferredScheduler {
    /// Build from the host's deferred-execution primitive.
    #[must_use]
    pub fn new(defer: Rc<dyn Fn(Box<dyn FnOnce()>)>) -> Self {
        Self { defer }
    }
}

impl FlushScheduler for DeferredScheduler {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        (self.defer)(callback);
    }
}

impl std::fmt::Debug for DeferredScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredScheduler").finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
