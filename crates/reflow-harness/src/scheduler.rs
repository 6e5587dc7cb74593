#![forbid(unsafe_code)]

//! Deterministic scheduling for tests.
//!
//! [`ManualScheduler`] parks every scheduled flush in a deque instead of
//! handing it to a timing API. Tests drive cycles explicitly with
//! [`fire_next`](ManualScheduler::fire_next) /
//! [`fire_all`](ManualScheduler::fire_all) and assert coalescing via
//! [`pending`](ManualScheduler::pending).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use reflow_core::FlushScheduler;

/// A [`FlushScheduler`] that runs nothing until told to. Clones share the
/// parked queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    parked: Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>,
}

impl ManualScheduler {
    /// A scheduler with nothing parked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled-but-unfired callbacks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.parked.borrow().len()
    }

    /// Fire the oldest parked callback. Returns false if none was parked.
    ///
    /// The callback may schedule again (a re-armed flush does); the new
    /// callback parks behind any others already waiting.
    pub fn fire_next(&self) -> bool {
        let next = self.parked.borrow_mut().pop_front();
        match next {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    /// Fire parked callbacks, including ones scheduled by the callbacks
    /// themselves, until none remain. Returns how many fired.
    pub fn fire_all(&self) -> usize {
        let mut fired = 0;
        while self.fire_next() {
            fired += 1;
        }
        fired
    }
}

impl FlushScheduler for ManualScheduler {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        self.parked.borrow_mut().push_back(callback);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
