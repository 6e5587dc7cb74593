//! Browser integration for the reflow batcher.
//!
//! Supplies the host capabilities the core leaves injected:
//!
//! - [`raf_primitive`] / [`timeout_primitive`]: `requestAnimationFrame` and
//!   `setTimeout` as the core's frame/timer primitive types.
//! - [`browser_scheduler`]: the once-at-startup strategy selection — the
//!   raced frame-vs-timer scheduler when `requestAnimationFrame` exists,
//!   a plain macrotask deferral otherwise.
//! - [`browser_batcher`]: a [`Batcher`](reflow_core::Batcher) wired to the
//!   selected strategy.
//! - [`install_visibility_advisory`]: debug-build `visibilitychange`
//!   listener that reports when work is queued while the tab is hidden.
//!
//! Everything here is `wasm32`-only; on other targets this crate compiles
//! to nothing.

#[cfg(target_arch = "wasm32")]
mod browser;

#[cfg(target_arch = "wasm32")]
pub use browser::{
    browser_batcher, browser_scheduler, has_frame_primitive, install_visibility_advisory,
    macrotask_primitive, raf_primitive, timeout_primitive,
};
