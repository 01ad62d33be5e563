//! Frame scheduling abstraction for driving animations.

use std::any::Any;

/// Callback invoked with the current timestamp when a requested frame fires.
///
/// The timestamp is in milliseconds, in the same time domain as
/// [`AnimationScheduler::now`].
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Capability for scheduling one-shot frame callbacks.
///
/// Implementations arrange for each requested callback to be invoked exactly
/// once, asynchronously, no earlier than the next scheduling opportunity.
/// Timestamps passed to callbacks are monotonic with respect to callbacks
/// requested earlier and not yet fired.
///
/// Two implementations ship with this crate: a browser-backed scheduler
/// (`web::WebAnimationScheduler`, behind the `web` feature) and a
/// manually-driven scheduler for tests
/// ([`StubAnimationScheduler`](crate::testing::StubAnimationScheduler)).
/// Both satisfy the same contract, so an [`Animation`](crate::Animation)
/// is agnostic to which one is injected.
pub trait AnimationScheduler {
    /// Request a single callback on the next frame.
    ///
    /// ## Arguments
    ///
    /// * `callback` - Invoked once with the frame timestamp in milliseconds
    /// * `hint` - Optional opaque scheduling hint (e.g. an on-screen element).
    ///   Advisory only: implementations may use it to scope the callback to a
    ///   visibility context, but absence must not change firing semantics.
    ///
    /// ## Returns
    ///
    /// A handle that can cancel the callback before it fires.
    fn request_animation_frame(
        &self,
        callback: FrameCallback,
        hint: Option<&dyn Any>,
    ) -> AnimationHandle;

    /// Current time in milliseconds, in the same domain as the timestamps
    /// passed to frame callbacks.
    fn now(&self) -> f64;
}

/// Handle to a pending frame request.
///
/// Cancelling prevents the callback from firing. Cancelling after the
/// callback has already fired, or cancelling twice, is a no-op.
pub struct AnimationHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl AnimationHandle {
    /// Create a handle whose cancellation runs the given closure.
    ///
    /// The closure runs at most once. Scheduler implementations must make it
    /// safe to call after the callback has fired.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Create a handle that controls nothing.
    ///
    /// Useful for scheduler backends whose pending callbacks cannot be
    /// revoked.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Cancel the pending frame request.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("cancelled", &self.cancel.is_none())
            .finish()
    }
}

/// Browser-backed scheduling implementation.
#[cfg(feature = "web")]
pub mod web {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};

    /// Delay between frames when falling back to `setTimeout`, targeting
    /// roughly 60 frames per second.
    const TIMER_FRAME_DELAY_MS: i32 = 16;

    /// Scheduler backed by the browser's `requestAnimationFrame`.
    ///
    /// When the frame callback API is unavailable, every request falls back
    /// to a fixed-rate `setTimeout` timer, timestamped from
    /// `performance.now()` so both paths share one time domain.
    ///
    /// ## Example
    ///
    /// ```rust,ignore
    /// use std::rc::Rc;
    /// use frametick::{Animation, AnimationScheduler};
    /// use frametick::web::WebAnimationScheduler;
    ///
    /// let scheduler = Rc::new(WebAnimationScheduler::new()?);
    /// let animation = Animation::new(scheduler, hooks);
    /// animation.run(250.0);
    /// ```
    pub struct WebAnimationScheduler {
        window: web_sys::Window,
        performance: web_sys::Performance,
        /// Whether `requestAnimationFrame` exists on the window.
        native_frames: bool,
        live: Rc<LiveClosures>,
    }

    /// Closures handed to the browser, retained until they fire or are
    /// cancelled so neither path leaks.
    #[derive(Default)]
    struct LiveClosures {
        next_key: Cell<u64>,
        closures: RefCell<HashMap<u64, LiveClosure>>,
    }

    enum LiveClosure {
        Frame(Closure<dyn FnMut(f64)>),
        Timer(Closure<dyn FnMut()>),
    }

    impl LiveClosures {
        fn next_key(&self) -> u64 {
            let key = self.next_key.get();
            self.next_key.set(key + 1);
            key
        }
    }

    impl WebAnimationScheduler {
        /// Create a scheduler bound to the current window.
        ///
        /// ## Returns
        ///
        /// `Ok(scheduler)` on success, or an error message when the window
        /// or its performance timer is unavailable.
        pub fn new() -> Result<Self, String> {
            let window = web_sys::window().ok_or("No window available")?;
            let performance = window
                .performance()
                .ok_or("No performance timer available")?;
            let native_frames = js_sys::Reflect::has(
                window.as_ref(),
                &JsValue::from_str("requestAnimationFrame"),
            )
            .unwrap_or(false);

            Ok(Self {
                window,
                performance,
                native_frames,
                live: Rc::new(LiveClosures::default()),
            })
        }

        /// Check whether native frame callbacks are in use (as opposed to
        /// the timer fallback).
        #[inline]
        pub fn is_native(&self) -> bool {
            self.native_frames
        }

        fn request_native_frame(&self, callback: FrameCallback) -> AnimationHandle {
            let key = self.live.next_key();
            let live = Rc::clone(&self.live);
            let mut callback = Some(callback);
            let closure = Closure::wrap(Box::new(move |timestamp: f64| {
                // Removing ourselves frees the closure once this call
                // returns; wasm-bindgen defers the deallocation.
                let _guard = live.closures.borrow_mut().remove(&key);
                if let Some(callback) = callback.take() {
                    callback(timestamp);
                }
            }) as Box<dyn FnMut(f64)>);

            let frame_id = self
                .window
                .request_animation_frame(closure.as_ref().unchecked_ref())
                .expect("requestAnimationFrame failed");
            self.live
                .closures
                .borrow_mut()
                .insert(key, LiveClosure::Frame(closure));

            let live = Rc::clone(&self.live);
            let window = self.window.clone();
            AnimationHandle::new(move || {
                if live.closures.borrow_mut().remove(&key).is_some() {
                    let _ = window.cancel_animation_frame(frame_id);
                }
            })
        }

        fn request_timer_frame(&self, callback: FrameCallback) -> AnimationHandle {
            let key = self.live.next_key();
            let live = Rc::clone(&self.live);
            let performance = self.performance.clone();
            let mut callback = Some(callback);
            let closure = Closure::wrap(Box::new(move || {
                let _guard = live.closures.borrow_mut().remove(&key);
                if let Some(callback) = callback.take() {
                    callback(performance.now());
                }
            }) as Box<dyn FnMut()>);

            let timer_id = self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    closure.as_ref().unchecked_ref(),
                    TIMER_FRAME_DELAY_MS,
                )
                .expect("setTimeout failed");
            self.live
                .closures
                .borrow_mut()
                .insert(key, LiveClosure::Timer(closure));

            let live = Rc::clone(&self.live);
            let window = self.window.clone();
            AnimationHandle::new(move || {
                if live.closures.borrow_mut().remove(&key).is_some() {
                    window.clear_timeout_with_handle(timer_id);
                }
            })
        }
    }

    impl AnimationScheduler for WebAnimationScheduler {
        fn request_animation_frame(
            &self,
            callback: FrameCallback,
            _hint: Option<&dyn Any>,
        ) -> AnimationHandle {
            // Standard requestAnimationFrame takes no scope element, so the
            // hint is accepted but unused.
            if self.native_frames {
                self.request_native_frame(callback)
            } else {
                self.request_timer_frame(callback)
            }
        }

        fn now(&self) -> f64 {
            self.performance.now()
        }
    }

    /// Get the shared per-thread scheduler, creating it on first use.
    ///
    /// ## Returns
    ///
    /// The shared scheduler, or an error message when the window is
    /// unavailable.
    pub fn default_scheduler() -> Result<Rc<WebAnimationScheduler>, String> {
        thread_local! {
            static SCHEDULER: RefCell<Option<Rc<WebAnimationScheduler>>> =
                const { RefCell::new(None) };
        }
        SCHEDULER.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(scheduler) = slot.as_ref() {
                return Ok(Rc::clone(scheduler));
            }
            let scheduler = Rc::new(WebAnimationScheduler::new()?);
            *slot = Some(Rc::clone(&scheduler));
            Ok(scheduler)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_handle_cancel_runs_once() {
        let count = Rc::new(Cell::new(0));
        let count2 = Rc::clone(&count);
        let mut handle = AnimationHandle::new(move || count2.set(count2.get() + 1));

        handle.cancel();
        assert_eq!(count.get(), 1);

        // Second cancel is a no-op.
        handle.cancel();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_inert_handle() {
        let mut handle = AnimationHandle::inert();
        handle.cancel();
        handle.cancel();
    }
}
