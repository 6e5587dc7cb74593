#![forbid(unsafe_code)]

//! Counting waiters and the named-waiter registry.
//!
//! A [`CountingWaiter`] tracks the set of outstanding tokens for one queue.
//! The [`WaiterRegistry`] holds any number of named waiters and answers
//! settling queries across all of them, so a harness can block until async
//! work drains and report *which* queue is stuck.
//!
//! Mispaired releases (unknown token, double release) are tolerated but
//! counted — they indicate a bracketing bug in the code under test, and
//! assertions can check [`CountingWaiter::mispaired_releases`].

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use tracing::warn;

use reflow_core::{Waiter, WaiterToken};

// ---------------------------------------------------------------------------
// CountingWaiter
// ---------------------------------------------------------------------------

struct CountingInner {
    name: String,
    next_token: Cell<u64>,
    outstanding: RefCell<HashSet<u64>>,
    mispaired: Cell<usize>,
}

/// A [`Waiter`] that tracks outstanding tokens. Clones share state.
#[derive(Clone)]
pub struct CountingWaiter {
    inner: Rc<CountingInner>,
}

impl CountingWaiter {
    /// Build a named waiter. Usually reached through
    /// [`WaiterRegistry::build_waiter`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(CountingInner {
                name: name.into(),
                next_token: Cell::new(0),
                outstanding: RefCell::new(HashSet::new()),
                mispaired: Cell::new(0),
            }),
        }
    }

    /// The name given at construction.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.name.clone()
    }

    /// Number of begun-but-not-ended tokens.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.outstanding.borrow().len()
    }

    /// True when no tokens are outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.inner.outstanding.borrow().is_empty()
    }

    /// Count of `end_async` calls that did not match an outstanding token.
    #[must_use]
    pub fn mispaired_releases(&self) -> usize {
        self.inner.mispaired.get()
    }
}

impl Waiter for CountingWaiter {
    fn begin_async(&self) -> WaiterToken {
        let raw = self.inner.next_token.get();
        self.inner.next_token.set(raw + 1);
        self.inner.outstanding.borrow_mut().insert(raw);
        WaiterToken::from_raw(raw)
    }

    fn end_async(&self, token: WaiterToken) {
        if !self.inner.outstanding.borrow_mut().remove(&token.into_raw()) {
            self.inner.mispaired.set(self.inner.mispaired.get() + 1);
            warn!(
                waiter = self.inner.name,
                token = token.into_raw(),
                "end_async for a token that is not outstanding"
            );
        }
    }
}

impl std::fmt::Debug for CountingWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingWaiter")
            .field("name", &self.inner.name)
            .field("pending", &self.pending())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WaiterRegistry
// ---------------------------------------------------------------------------

/// Named collection of [`CountingWaiter`]s with cross-waiter settling
/// queries. Clones share state.
#[derive(Clone, Default)]
pub struct WaiterRegistry {
    waiters: Rc<RefCell<Vec<CountingWaiter>>>,
}

impl WaiterRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named waiter registered with this registry.
    pub fn build_waiter(&self, name: impl Into<String>) -> CountingWaiter {
        let waiter = CountingWaiter::new(name);
        self.waiters.borrow_mut().push(waiter.clone());
        waiter
    }

    /// True when every registered waiter is settled.
    #[must_use]
    pub fn settled(&self) -> bool {
        self.waiters.borrow().iter().all(CountingWaiter::is_settled)
    }

    /// Outstanding tokens summed across all registered waiters.
    #[must_use]
    pub fn total_pending(&self) -> usize {
        self.waiters.borrow().iter().map(CountingWaiter::pending).sum()
    }

    /// Names of waiters that still have outstanding tokens, in registration
    /// order.
    #[must_use]
    pub fn pending_names(&self) -> Vec<String> {
        self.waiters
            .borrow()
            .iter()
            .filter(|w| !w.is_settled())
            .map(CountingWaiter::name)
            .collect()
    }
}

impl std::fmt::Debug for WaiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaiterRegistry")
            .field("waiters", &self.waiters.borrow().len())
            .field("total_pending", &self.total_pending())
            .finish()
    }
}
