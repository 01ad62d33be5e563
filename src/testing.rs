//! Deterministic scheduler for driving animations in tests.

use crate::scheduler::{AnimationHandle, AnimationScheduler, FrameCallback};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A scheduler that never executes callbacks on its own.
///
/// Requested callbacks are queued in insertion order; the test driver
/// removes and invokes them manually with a chosen timestamp, so the
/// animation state machine can be driven without real elapsed time. By
/// convention the most recently requested callback is executed via
/// [`execute_last`].
///
/// The current time reported by [`now`](AnimationScheduler::now) starts at
/// `0.0` and only moves when [`set_now`] is called.
///
/// Clones share the same queue and clock.
///
/// ## Example
///
/// ```rust
/// use std::rc::Rc;
/// use frametick::AnimationScheduler;
/// use frametick::testing::StubAnimationScheduler;
///
/// let scheduler = Rc::new(StubAnimationScheduler::new());
/// let mut handle = scheduler.request_animation_frame(Box::new(|t| assert_eq!(t, 16.0)), None);
/// assert_eq!(scheduler.pending_count(), 1);
///
/// scheduler.execute_last(16.0);
/// assert_eq!(scheduler.pending_count(), 0);
///
/// // Cancelling after the callback fired is a no-op.
/// handle.cancel();
/// ```
///
/// [`execute_last`]: StubAnimationScheduler::execute_last
/// [`set_now`]: StubAnimationScheduler::set_now
#[derive(Clone, Default)]
pub struct StubAnimationScheduler {
    inner: Rc<StubInner>,
}

#[derive(Default)]
struct StubInner {
    callbacks: RefCell<Vec<PendingFrame>>,
    next_id: Cell<u64>,
    now: Cell<f64>,
}

struct PendingFrame {
    id: u64,
    callback: FrameCallback,
}

impl StubAnimationScheduler {
    /// Create an empty scheduler with the clock at `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks that have been requested and not yet fired or
    /// cancelled.
    pub fn pending_count(&self) -> usize {
        self.inner.callbacks.borrow().len()
    }

    /// Set the timestamp returned by [`now`](AnimationScheduler::now).
    pub fn set_now(&self, timestamp: f64) {
        self.inner.now.set(timestamp);
    }

    /// Remove the most recently requested callback and invoke it with the
    /// given timestamp.
    ///
    /// ## Panics
    ///
    /// Panics if no callback is pending.
    pub fn execute_last(&self, timestamp: f64) {
        let frame = self
            .inner
            .callbacks
            .borrow_mut()
            .pop()
            .expect("no pending animation callbacks");
        // The queue borrow is released before the callback runs, so the
        // callback may request new frames.
        (frame.callback)(timestamp);
    }

    /// Remove the oldest pending callback and invoke it with the given
    /// timestamp.
    ///
    /// ## Panics
    ///
    /// Panics if no callback is pending.
    pub fn execute_first(&self, timestamp: f64) {
        let mut callbacks = self.inner.callbacks.borrow_mut();
        assert!(!callbacks.is_empty(), "no pending animation callbacks");
        let frame = callbacks.remove(0);
        drop(callbacks);
        (frame.callback)(timestamp);
    }

    /// Remove the most recently requested callback without invoking it.
    ///
    /// Useful for delivering a tick after its animation has been cancelled
    /// or restarted.
    pub fn take_last(&self) -> Option<FrameCallback> {
        self.inner
            .callbacks
            .borrow_mut()
            .pop()
            .map(|frame| frame.callback)
    }
}

impl AnimationScheduler for StubAnimationScheduler {
    fn request_animation_frame(
        &self,
        callback: FrameCallback,
        _hint: Option<&dyn Any>,
    ) -> AnimationHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .callbacks
            .borrow_mut()
            .push(PendingFrame { id, callback });

        // Identity-based removal: with several animations sharing the
        // scheduler, cancelling must drop exactly this callback, not
        // whatever sits at some index. Removing an id that already fired
        // is a no-op.
        let inner = Rc::clone(&self.inner);
        AnimationHandle::new(move || {
            inner.callbacks.borrow_mut().retain(|frame| frame.id != id);
        })
    }

    fn now(&self) -> f64 {
        self.inner.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(scheduler: &StubAnimationScheduler, log: &Rc<RefCell<Vec<(u32, f64)>>>, tag: u32) -> AnimationHandle {
        let log = Rc::clone(log);
        scheduler.request_animation_frame(
            Box::new(move |t| log.borrow_mut().push((tag, t))),
            None,
        )
    }

    #[test]
    fn test_queues_in_insertion_order() {
        let scheduler = StubAnimationScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let _a = record(&scheduler, &log, 1);
        let _b = record(&scheduler, &log, 2);
        let _c = record(&scheduler, &log, 3);
        assert_eq!(scheduler.pending_count(), 3);

        // Newest first by convention, oldest via execute_first.
        scheduler.execute_last(10.0);
        scheduler.execute_first(20.0);
        scheduler.execute_last(30.0);
        assert_eq!(*log.borrow(), vec![(3, 10.0), (1, 20.0), (2, 30.0)]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_cancel_removes_exact_callback() {
        let scheduler = StubAnimationScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let _a = record(&scheduler, &log, 1);
        let mut b = record(&scheduler, &log, 2);
        let _c = record(&scheduler, &log, 3);

        b.cancel();
        assert_eq!(scheduler.pending_count(), 2);

        scheduler.execute_last(1.0);
        scheduler.execute_last(2.0);
        assert_eq!(*log.borrow(), vec![(3, 1.0), (1, 2.0)]);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let scheduler = StubAnimationScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut a = record(&scheduler, &log, 1);
        let _b = record(&scheduler, &log, 2);

        scheduler.execute_first(5.0);
        assert_eq!(scheduler.pending_count(), 1);

        // The callback already fired; the other one must survive.
        a.cancel();
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.execute_last(6.0);
        assert_eq!(*log.borrow(), vec![(1, 5.0), (2, 6.0)]);
    }

    #[test]
    fn test_callback_may_request_new_frames() {
        let scheduler = StubAnimationScheduler::new();
        let chained = Rc::new(Cell::new(false));

        let inner_scheduler = scheduler.clone();
        let flag = Rc::clone(&chained);
        let _handle = scheduler.request_animation_frame(
            Box::new(move |_| {
                inner_scheduler.request_animation_frame(Box::new(move |_| flag.set(true)), None);
            }),
            None,
        );

        scheduler.execute_last(1.0);
        assert_eq!(scheduler.pending_count(), 1);
        scheduler.execute_last(2.0);
        assert!(chained.get());
    }

    #[test]
    fn test_manual_clock() {
        let scheduler = StubAnimationScheduler::new();
        assert_eq!(scheduler.now(), 0.0);
        scheduler.set_now(1234.5);
        assert_eq!(scheduler.now(), 1234.5);
    }

    #[test]
    #[should_panic(expected = "no pending animation callbacks")]
    fn test_execute_last_empty_panics() {
        StubAnimationScheduler::new().execute_last(0.0);
    }
}
