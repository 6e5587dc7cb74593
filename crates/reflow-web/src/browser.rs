//! `wasm32` bindings: timing primitives, strategy selection, advisory
//! wiring.

use std::rc::Rc;
use std::time::Duration;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use reflow_core::{
    Batcher, DeferredScheduler, FlushScheduler, FramePrimitive, RacedScheduler, TimerPrimitive,
};

// Direct global bindings instead of `web_sys::Window` methods — works in
// both window and worker globals, and skips the per-call Window lookup.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(callback: &JsValue, millis: i32) -> i32;
}

/// Whether the global scope exposes `requestAnimationFrame`.
///
/// Checked once at startup by [`browser_scheduler`]; workers and some
/// embedded hosts don't have it.
#[must_use]
pub fn has_frame_primitive() -> bool {
    js_sys::Reflect::has(
        &js_sys::global(),
        &JsValue::from_str("requestAnimationFrame"),
    )
    .unwrap_or(false)
}

/// `requestAnimationFrame` as a frame primitive.
///
/// Each registered callback is a one-shot JS closure; its Rust side is
/// freed after the frame fires.
#[must_use]
pub fn raf_primitive() -> FramePrimitive {
    Rc::new(|callback: Box<dyn FnOnce()>| {
        let closure = Closure::once_into_js(move |_timestamp: f64| callback());
        let _ = request_animation_frame(&closure);
    })
}

/// `setTimeout` as a delay-timer primitive.
#[must_use]
pub fn timeout_primitive() -> TimerPrimitive {
    Rc::new(|delay: Duration, callback: Box<dyn FnOnce()>| {
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let closure = Closure::once_into_js(move || callback());
        let _ = set_timeout(&closure, millis);
    })
}

/// Zero-delay `setTimeout`: the macrotask fallback for hosts without frame
/// timing.
#[must_use]
pub fn macrotask_primitive() -> Rc<dyn Fn(Box<dyn FnOnce()>)> {
    Rc::new(|callback: Box<dyn FnOnce()>| {
        let closure = Closure::once_into_js(move || callback());
        let _ = set_timeout(&closure, 0);
    })
}

/// Select the scheduling strategy for this host, once, at startup.
#[must_use]
pub fn browser_scheduler() -> Box<dyn FlushScheduler> {
    if has_frame_primitive() {
        Box::new(RacedScheduler::new(raf_primitive(), timeout_primitive()))
    } else {
        Box::new(DeferredScheduler::new(macrotask_primitive()))
    }
}

/// A batcher wired to [`browser_scheduler`].
#[must_use]
pub fn browser_batcher() -> Batcher {
    Batcher::new(browser_scheduler())
}

/// Register the hidden-environment advisory on `visibilitychange`.
///
/// Debug builds only; release builds compile this to a no-op. The advisory
/// reports through `tracing::error!` and never alters flushing.
pub fn install_visibility_advisory(batcher: &Batcher) {
    #[cfg(debug_assertions)]
    {
        use reflow_core::visibility_advisory;
        use wasm_bindgen::JsCast;

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let doc = document.clone();
        let handle = batcher.clone();
        let check = visibility_advisory(move || doc.hidden(), move || handle.has_queued_work());

        let listener = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_event: web_sys::Event| {
            if let Err(err) = check() {
                tracing::error!(%err, "visibility advisory");
            }
        }));
        if document
            .add_event_listener_with_callback("visibilitychange", listener.as_ref().unchecked_ref())
            .is_ok()
        {
            // The listener lives for the rest of the page's lifetime.
            listener.forget();
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = batcher;
    }
}
