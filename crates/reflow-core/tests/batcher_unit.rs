#![forbid(unsafe_code)]

//! These were originally `#[cfg(test)] mod tests` inside `src/batcher.rs`.
//! They live here as integration tests because `reflow-core`'s dev-dependency
//! on `reflow-harness` (which itself depends on `reflow-core`) makes the
//! crate compile twice for unit tests in `src/`, producing two distinct
//! `FlushScheduler`/`Waiter` trait identities; integration tests link a
//! single copy of the lib and don't hit that.

use std::cell::RefCell;
use std::rc::Rc;

use reflow_core::Batcher;
use reflow_harness::{ManualScheduler, WaiterRegistry};

fn logging_batcher() -> (Batcher, ManualScheduler, Rc<RefCell<Vec<String>>>) {
    let scheduler = ManualScheduler::new();
    let batcher = Batcher::new(scheduler.clone());
    (batcher, scheduler, Rc::new(RefCell::new(Vec::new())))
}

fn push(log: &Rc<RefCell<Vec<String>>>, entry: &str) -> impl FnOnce() + 'static {
    let log = Rc::clone(log);
    let entry = entry.to_string();
    move || log.borrow_mut().push(entry)
}

// ---- ordering tests ----

#[test]
fn reads_run_before_mutations() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_mutate(push(&log, "m1"));
    batcher.enqueue_read(push(&log, "r1"));

    scheduler.fire_all();
    assert_eq!(*log.borrow(), ["r1", "m1"]);
}

#[test]
fn phases_are_lifo() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_read(push(&log, "a"));
    batcher.enqueue_read(push(&log, "b"));
    batcher.enqueue_read(push(&log, "c"));

    scheduler.fire_all();
    assert_eq!(
        *log.borrow(),
        ["c", "b", "a"],
        "most recently enqueued read must run first"
    );
}

#[test]
fn reads_then_mutation_scenario() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_read(push(&log, "r1"));
    batcher.enqueue_read(push(&log, "r2"));
    batcher.enqueue_mutate(push(&log, "m1"));

    scheduler.fire_all();
    assert_eq!(*log.borrow(), ["r2", "r1", "m1"]);
}

// ---- coalescing / run-state tests ----

#[test]
fn many_enqueues_one_scheduled_flush() {
    let (batcher, scheduler, log) = logging_batcher();
    for i in 0..10 {
        batcher.enqueue_read(push(&log, &format!("r{i}")));
        batcher.enqueue_mutate(push(&log, &format!("m{i}")));
    }
    assert_eq!(scheduler.pending(), 1, "enqueues must coalesce");
    assert!(batcher.is_running());

    scheduler.fire_all();
    assert_eq!(log.borrow().len(), 20);
    assert!(!batcher.is_running());
}

#[test]
fn separate_cycles_for_separate_enqueues() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_read(push(&log, "first"));
    assert_eq!(scheduler.fire_all(), 1);
    assert_eq!(*log.borrow(), ["first"]);

    batcher.enqueue_read(push(&log, "second"));
    assert_eq!(scheduler.fire_all(), 1);
    assert_eq!(*log.borrow(), ["first", "second"]);
}

#[test]
fn empty_flush_does_not_rearm() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_read(push(&log, "only"));
    scheduler.fire_all();
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(batcher.pending_reads(), 0);
}

// ---- re-entrant enqueue tests ----

#[test]
fn mutation_enqueuing_read_defers_to_next_cycle() {
    let (batcher, scheduler, log) = logging_batcher();
    let b = batcher.clone();
    let l = Rc::clone(&log);
    batcher.enqueue_mutate(move || {
        l.borrow_mut().push("m".into());
        let l2 = Rc::clone(&l);
        b.enqueue_read(move || l2.borrow_mut().push("late-read".into()));
    });

    assert!(scheduler.fire_next());
    assert_eq!(
        *log.borrow(),
        ["m"],
        "read enqueued from a mutation must not run in the same cycle"
    );
    assert_eq!(scheduler.pending(), 1, "flush must re-arm for the new read");

    assert!(scheduler.fire_next());
    assert_eq!(*log.borrow(), ["m", "late-read"]);
}

#[test]
fn same_phase_reentrant_enqueue_runs_within_captured_count() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_read(push(&log, "r1"));
    let b = batcher.clone();
    let l = Rc::clone(&log);
    batcher.enqueue_read(move || {
        l.borrow_mut().push("r2".into());
        let l2 = Rc::clone(&l);
        // Lands at the front mid-drain, inside the captured count of 2.
        b.enqueue_read(move || l2.borrow_mut().push("r3".into()));
    });

    scheduler.fire_next();
    // The captured count of 2 covers r2 and the front-inserted r3; r1
    // was displaced past the window and waits for the re-armed cycle.
    assert_eq!(*log.borrow(), ["r2", "r3"]);
    assert_eq!(batcher.pending_reads(), 1);
    assert_eq!(scheduler.pending(), 1);

    scheduler.fire_next();
    assert_eq!(*log.borrow(), ["r2", "r3", "r1"]);
}

#[test]
fn beyond_window_reentrant_enqueue_waits_for_next_cycle() {
    let (batcher, scheduler, log) = logging_batcher();
    let b = batcher.clone();
    let l = Rc::clone(&log);
    // Single read whose body enqueues after its own pop: count was
    // captured at 1 and is already exhausted, so the new read waits.
    batcher.enqueue_read(move || {
        l.borrow_mut().push("r1".into());
        let l2 = Rc::clone(&l);
        b.enqueue_read(move || l2.borrow_mut().push("r2".into()));
    });

    scheduler.fire_next();
    assert_eq!(*log.borrow(), ["r1"]);
    assert_eq!(scheduler.pending(), 1);

    scheduler.fire_next();
    assert_eq!(*log.borrow(), ["r1", "r2"]);
}

#[test]
fn rearmed_cycle_runs_reads_before_mutations_again() {
    let (batcher, scheduler, log) = logging_batcher();
    let b = batcher.clone();
    let l = Rc::clone(&log);
    batcher.enqueue_mutate(move || {
        l.borrow_mut().push("m1".into());
        let l2 = Rc::clone(&l);
        let l3 = Rc::clone(&l);
        b.enqueue_mutate(move || l2.borrow_mut().push("m2".into()));
        b.enqueue_read(move || l3.borrow_mut().push("r2".into()));
    });

    scheduler.fire_next();
    scheduler.fire_next();
    assert_eq!(*log.borrow(), ["m1", "r2", "m2"]);
}

// ---- panic isolation tests ----

#[test]
fn panicking_task_does_not_stop_siblings_or_other_phase() {
    let (batcher, scheduler, log) = logging_batcher();
    batcher.enqueue_mutate(push(&log, "m1"));
    batcher.enqueue_read(push(&log, "r1"));
    batcher.enqueue_read(|| panic!("boom"));
    batcher.enqueue_read(push(&log, "r2"));

    scheduler.fire_all();
    assert_eq!(*log.borrow(), ["r2", "r1", "m1"]);
    assert_eq!(batcher.take_panic_count(), 1);
    assert_eq!(batcher.take_panic_count(), 0, "count reads and resets");
}

#[test]
fn panicking_task_still_releases_waiter_token() {
    let registry = WaiterRegistry::new();
    let read_waiter = registry.build_waiter("reflow: read");
    let mutate_waiter = registry.build_waiter("reflow: mutate");
    let scheduler = ManualScheduler::new();
    let batcher = Batcher::with_waiters(
        scheduler.clone(),
        Rc::new(read_waiter),
        Rc::new(mutate_waiter),
    );

    batcher.enqueue_read(|| panic!("boom"));
    batcher.enqueue_mutate(|| {});
    assert!(!registry.settled());

    scheduler.fire_all();
    assert!(
        registry.settled(),
        "tokens must be released even for panicking tasks"
    );
    assert_eq!(batcher.take_panic_count(), 1);
}

// ---- lifetime tests ----

#[test]
fn pending_flush_outlives_dropped_handle() {
    let scheduler = ManualScheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let batcher = Batcher::new(scheduler.clone());
        let l = Rc::clone(&log);
        batcher.enqueue_read(move || l.borrow_mut().push("ran"));
    }
    scheduler.fire_all();
    assert_eq!(*log.borrow(), ["ran"], "queued work must survive handle drop");
}

#[test]
fn debug_reports_queue_depths() {
    let (batcher, _scheduler, log) = logging_batcher();
    batcher.enqueue_read(push(&log, "r"));
    let debug = format!("{batcher:?}");
    assert!(debug.contains("pending_reads: 1"));
    assert!(debug.contains("running: true"));
}
