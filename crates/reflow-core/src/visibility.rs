#![forbid(unsafe_code)]

//! Hidden-environment advisory.
//!
//! Frame callbacks stop (or throttle heavily) when the host is visually
//! hidden — a backgrounded browser tab, a minimized webview. Work queued in
//! both phases while hidden may sit for a long time, so debug builds can
//! wire [`visibility_advisory`] to the host's visibility-change event and
//! surface a warning. The check is advisory only: it never blocks or alters
//! flushing.
//!
//! Both inputs are injected predicates rather than environment globals, so
//! the check is testable anywhere; `reflow-web` supplies the real
//! `document.hidden` wiring.

use thiserror::Error;

/// Warning raised when batched work is queued while the host is hidden.
#[derive(Debug, Error)]
#[error(
    "the host environment is hidden; batched read/mutate execution timing is not guaranteed \
     until it becomes visible again"
)]
pub struct HiddenEnvironmentError;

/// Build the advisory check from a `hidden` predicate and a
/// `has_queued_work` predicate (conventionally
/// [`Batcher::has_queued_work`](crate::Batcher::has_queued_work), which is
/// true only when *both* phases hold work).
///
/// The returned closure is intended to run on each visibility change; it
/// fails only when both predicates hold.
pub fn visibility_advisory(
    hidden: impl Fn() -> bool + 'static,
    has_queued_work: impl Fn() -> bool + 'static,
) -> impl Fn() -> Result<(), HiddenEnvironmentError> {
    move || {
        if hidden() && has_queued_work() {
            Err(HiddenEnvironmentError)
        } else {
            Ok(())
        }
    }
}
