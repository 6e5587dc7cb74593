#![forbid(unsafe_code)]

//! These were originally `#[cfg(test)] mod tests` inside `src/visibility.rs`.
//! They live here as integration tests because `reflow-core`'s dev-dependency
//! on `reflow-harness` (which itself depends on `reflow-core`) makes the
//! crate compile twice for unit tests in `src/`, producing two distinct
//! `FlushScheduler`/`Waiter` trait identities; integration tests link a
//! single copy of the lib and don't hit that.

use reflow_core::{Batcher, HiddenEnvironmentError, visibility_advisory};
use reflow_harness::ManualScheduler;

#[test]
fn fires_only_when_hidden_with_queued_work() {
    let check = visibility_advisory(|| true, || true);
    assert!(check().is_err());

    let check = visibility_advisory(|| true, || false);
    assert!(check().is_ok());

    let check = visibility_advisory(|| false, || true);
    assert!(check().is_ok());

    let check = visibility_advisory(|| false, || false);
    assert!(check().is_ok());
}

#[test]
fn batcher_predicate_requires_both_phases() {
    let scheduler = ManualScheduler::new();
    let batcher = Batcher::new(scheduler.clone());
    assert!(!batcher.has_queued_work());

    batcher.enqueue_read(|| {});
    assert!(!batcher.has_queued_work(), "reads alone do not qualify");

    batcher.enqueue_mutate(|| {});
    assert!(batcher.has_queued_work());

    scheduler.fire_all();
    assert!(!batcher.has_queued_work());
}

#[test]
fn advisory_does_not_disturb_flushing() {
    let scheduler = ManualScheduler::new();
    let batcher = Batcher::new(scheduler.clone());
    batcher.enqueue_read(|| {});
    batcher.enqueue_mutate(|| {});

    let b = batcher.clone();
    let check = visibility_advisory(|| true, move || b.has_queued_work());
    assert!(check().is_err());

    // Queues and scheduling are untouched by the check.
    assert_eq!(batcher.pending_reads(), 1);
    assert_eq!(batcher.pending_mutations(), 1);
    assert_eq!(scheduler.pending(), 1);
    scheduler.fire_all();
    assert!(check().is_ok());
}

#[test]
fn error_message_names_the_condition() {
    let message = HiddenEnvironmentError.to_string();
    assert!(message.contains("hidden"));
    assert!(message.contains("not guaranteed"));
}
