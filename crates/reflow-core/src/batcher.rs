#![forbid(unsafe_code)]

//! The batcher: two ordered queues and the flush cycle that drains them.
//!
//! [`Batcher::enqueue_read`] and [`Batcher::enqueue_mutate`] push work onto
//! the read and mutation queues and arm a flush. The flush — one scheduled
//! callback per cycle, no matter how many enqueues requested it — drains the
//! read queue, then the mutation queue, then re-arms itself if new work
//! arrived while it ran.
//!
//! # Ordering
//!
//! Insertion is at the front of a queue and the drain pops from the front,
//! so each phase executes LIFO: the most recently enqueued task runs first.
//! Callers may depend on this, in either direction; it is part of the
//! contract. The drain is bounded by the queue length captured when the
//! phase starts, so a task enqueued mid-drain into the *same* phase is
//! picked up by the running drain while that count lasts, and anything
//! beyond the count waits for the next cycle.
//!
//! # Panic policy
//!
//! Each task runs isolated under `catch_unwind`: a panicking task never
//! prevents sibling tasks or the other phase from running, and its waiter
//! token is released either way. Panics are reported via `tracing::error!`
//! and counted; [`Batcher::take_panic_count`] reads and clears the count.
//!
//! # Failure Modes
//!
//! - Task panics: isolated, logged, counted (see above).
//! - Batcher handle dropped with work queued: the pending flush holds the
//!   queues alive and still runs when the primitive fires.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{error, trace};

use crate::schedule::FlushScheduler;
use crate::waiter::{NoopWaiter, Waiter, WaiterToken};

type Task = Box<dyn FnOnce()>;

/// One queued task plus the settling handle issued when it was enqueued.
struct QueuedOperation {
    token: WaiterToken,
    task: Task,
}

struct BatcherInner {
    reads: RefCell<VecDeque<QueuedOperation>>,
    mutations: RefCell<VecDeque<QueuedOperation>>,
    /// True exactly while a flush has been requested but has not finished
    /// its drain-and-check step.
    running: Cell<bool>,
    panics: Cell<usize>,
    scheduler: Box<dyn FlushScheduler>,
    read_waiter: Rc<dyn Waiter>,
    mutate_waiter: Rc<dyn Waiter>,
}

/// Batches read and mutation callbacks into per-frame flushes.
///
/// Cloning yields another handle to the same queues. Constructed once per
/// application context with the host's scheduling strategy; see the crate
/// docs for an example.
pub struct Batcher {
    inner: Rc<BatcherInner>,
}

impl Batcher {
    /// Build a batcher with no settling instrumentation.
    #[must_use]
    pub fn new(scheduler: impl FlushScheduler + 'static) -> Self {
        Self::with_waiters(scheduler, Rc::new(NoopWaiter), Rc::new(NoopWaiter))
    }

    /// Build a batcher whose read and mutation queues are bracketed by the
    /// given waiters.
    #[must_use]
    pub fn with_waiters(
        scheduler: impl FlushScheduler + 'static,
        read_waiter: Rc<dyn Waiter>,
        mutate_waiter: Rc<dyn Waiter>,
    ) -> Self {
        Self {
            inner: Rc::new(BatcherInner {
                reads: RefCell::new(VecDeque::new()),
                mutations: RefCell::new(VecDeque::new()),
                running: Cell::new(false),
                panics: Cell::new(0),
                scheduler: Box::new(scheduler),
                read_waiter,
                mutate_waiter,
            }),
        }
    }

    /// Queue a read task for the next flush's read phase.
    pub fn enqueue_read(&self, task: impl FnOnce() + 'static) {
        let token = self.inner.read_waiter.begin_async();
        self.inner.reads.borrow_mut().push_front(QueuedOperation {
            token,
            task: Box::new(task),
        });
        BatcherInner::request_run(&self.inner);
    }

    /// Queue a mutation task for the next flush's mutation phase.
    pub fn enqueue_mutate(&self, task: impl FnOnce() + 'static) {
        let token = self.inner.mutate_waiter.begin_async();
        self.inner
            .mutations
            .borrow_mut()
            .push_front(QueuedOperation {
                token,
                task: Box::new(task),
            });
        BatcherInner::request_run(&self.inner);
    }

    /// Number of reads currently queued.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.inner.reads.borrow().len()
    }

    /// Number of mutations currently queued.
    #[must_use]
    pub fn pending_mutations(&self) -> usize {
        self.inner.mutations.borrow().len()
    }

    /// True when work is queued in *both* phases — the condition under which
    /// the hidden-environment advisory fires (see
    /// [`visibility_advisory`](crate::visibility_advisory)).
    #[must_use]
    pub fn has_queued_work(&self) -> bool {
        !self.inner.reads.borrow().is_empty() && !self.inner.mutations.borrow().is_empty()
    }

    /// True while a flush cycle is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Read and reset the count of task panics isolated since the last call.
    pub fn take_panic_count(&self) -> usize {
        self.inner.panics.replace(0)
    }
}

impl Clone for Batcher {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Batcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("pending_reads", &self.pending_reads())
            .field("pending_mutations", &self.pending_mutations())
            .field("running", &self.is_running())
            .finish()
    }
}

impl BatcherInner {
    /// Arm a flush unless one is already in flight. The pending flush picks
    /// up later enqueues on its own: draining happens when the scheduled
    /// callback fires, not when it was requested.
    fn request_run(this: &Rc<Self>) {
        if this.running.get() {
            return;
        }
        this.running.set(true);
        trace!(
            reads = this.reads.borrow().len(),
            mutations = this.mutations.borrow().len(),
            "flush scheduled"
        );
        let inner = Rc::clone(this);
        this.scheduler.schedule(Box::new(move || inner.flush()));
    }

    fn flush(self: Rc<Self>) {
        self.drain(&self.reads, &*self.read_waiter, "read");
        self.drain(&self.mutations, &*self.mutate_waiter, "mutate");

        self.running.set(false);

        if !self.reads.borrow().is_empty() || !self.mutations.borrow().is_empty() {
            trace!("work arrived during flush, re-arming");
            Self::request_run(&self);
        }
    }

    /// Pop-and-run from the front of `queue`, bounded by the length captured
    /// here. Pops are destructive, so a same-phase task enqueued mid-drain
    /// extends the effective queue and runs within this pass while the
    /// captured count lasts.
    fn drain(&self, queue: &RefCell<VecDeque<QueuedOperation>>, waiter: &dyn Waiter, phase: &str) {
        let count = queue.borrow().len();
        for _ in 0..count {
            // Scope the borrow: the task may re-enter enqueue_*.
            let op = queue.borrow_mut().pop_front();
            let Some(QueuedOperation { token, task }) = op else {
                break;
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            waiter.end_async(token);
            if let Err(payload) = outcome {
                self.panics.set(self.panics.get() + 1);
                error!(
                    phase,
                    panic = panic_message(payload.as_ref()),
                    "task panicked during flush, isolating"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
