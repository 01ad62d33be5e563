//! Time-based animation lifecycle driven by a frame scheduler.

use crate::scheduler::{AnimationHandle, AnimationScheduler, FrameCallback};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Per-instance hooks customizing an [`Animation`].
///
/// All methods have default implementations, so an implementor only
/// overrides the events it cares about. Each hook receives the animation
/// that fired it and may re-enter [`Animation::run`] or
/// [`Animation::cancel`] on it; the animation commits its own state before
/// invoking any hook, so re-entrant calls observe consistent state.
///
/// Hooks take `&self`: implementations keep mutable state in `Cell` or
/// `RefCell`.
pub trait AnimationHooks {
    /// Called immediately before the animation starts.
    ///
    /// The default delivers `interpolate(0.0)` to [`on_update`].
    ///
    /// [`on_update`]: AnimationHooks::on_update
    fn on_start(&self, animation: &Animation) {
        self.on_update(animation, self.interpolate(0.0));
    }

    /// Called on each frame while the animation is in progress.
    ///
    /// `progress` is the interpolated time fraction, `0.0` at the start of
    /// the animation and `1.0` at the end (unless [`interpolate`] maps
    /// outside that range for overshoot effects).
    ///
    /// [`interpolate`]: AnimationHooks::interpolate
    fn on_update(&self, animation: &Animation, progress: f64) {
        let _ = (animation, progress);
    }

    /// Called immediately after the animation completes.
    ///
    /// The default delivers `interpolate(1.0)` to [`on_update`].
    ///
    /// [`on_update`]: AnimationHooks::on_update
    fn on_complete(&self, animation: &Animation) {
        self.on_update(animation, self.interpolate(1.0));
    }

    /// Called when the animation is cancelled.
    ///
    /// Fires at most once per run, and never after the animation has
    /// completed naturally: completion and cancellation are mutually
    /// exclusive terminal notifications.
    fn on_cancel(&self, animation: &Animation) {
        let _ = animation;
    }

    /// Map a linear time fraction in `[0, 1]` to the progress delivered to
    /// [`on_update`]. Defaults to the identity (linear) mapping.
    ///
    /// [`on_update`]: AnimationHooks::on_update
    fn interpolate(&self, fraction: f64) -> f64 {
        fraction
    }
}

/// What a tick decided to do, after state has been committed.
enum Tick {
    /// Start time not reached yet; chain another frame request.
    NotYet,
    /// First frame at or past the start time.
    Start { also_complete: bool },
    /// In-progress frame with the clamped time fraction.
    Update(f64),
    /// Duration elapsed.
    Complete,
}

struct Inner {
    scheduler: Rc<dyn AnimationScheduler>,
    hooks: Rc<dyn AnimationHooks>,
    /// Opaque hint forwarded to the scheduler on every frame request.
    hint: Option<Rc<dyn Any>>,
    duration: f64,
    start_time: f64,
    running: bool,
    started: bool,
    /// Incremented by every `run`, so ticks scheduled for an earlier run
    /// can be recognized and ignored.
    run_id: u64,
    /// Handle for the next pending tick. At most one exists at a time.
    handle: Option<AnimationHandle>,
}

/// A time-based animation scheduled through an [`AnimationScheduler`].
///
/// An animation is constructed idle, bound to a scheduler and a set of
/// [`AnimationHooks`]. Calling [`run`] starts it; the scheduler then drives
/// a chain of frame callbacks until the duration elapses or [`cancel`] is
/// called, after which the animation is idle again and can be re-run.
///
/// Cloning is cheap and clones share the same underlying animation.
///
/// ## Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use frametick::{Animation, AnimationHooks};
/// use frametick::testing::StubAnimationScheduler;
///
/// struct Fade {
///     opacity: Cell<f64>,
/// }
///
/// impl AnimationHooks for Fade {
///     fn on_update(&self, _animation: &Animation, progress: f64) {
///         self.opacity.set(1.0 - progress);
///     }
/// }
///
/// let scheduler = Rc::new(StubAnimationScheduler::new());
/// let fade = Rc::new(Fade { opacity: Cell::new(1.0) });
/// let animation = Animation::new(scheduler.clone(), fade.clone());
///
/// animation.run(1000.0);
/// assert!(animation.is_running());
///
/// // Drive the frame chain manually.
/// scheduler.execute_last(0.0);   // start: progress 0.0
/// scheduler.execute_last(500.0); // update: progress 0.5
/// assert_eq!(fade.opacity.get(), 0.5);
/// scheduler.execute_last(1000.0); // complete: progress 1.0
/// assert!(!animation.is_running());
/// assert_eq!(fade.opacity.get(), 0.0);
/// ```
///
/// [`run`]: Animation::run
/// [`cancel`]: Animation::cancel
#[derive(Clone)]
pub struct Animation {
    inner: Rc<RefCell<Inner>>,
}

impl Animation {
    /// Create an idle animation bound to the given scheduler and hooks.
    pub fn new(scheduler: Rc<dyn AnimationScheduler>, hooks: Rc<dyn AnimationHooks>) -> Self {
        Self::build(scheduler, hooks, None)
    }

    /// Create an idle animation that forwards an opaque scheduling hint
    /// (e.g. an on-screen element) with every frame request.
    pub fn with_hint(
        scheduler: Rc<dyn AnimationScheduler>,
        hooks: Rc<dyn AnimationHooks>,
        hint: Rc<dyn Any>,
    ) -> Self {
        Self::build(scheduler, hooks, Some(hint))
    }

    fn build(
        scheduler: Rc<dyn AnimationScheduler>,
        hooks: Rc<dyn AnimationHooks>,
        hint: Option<Rc<dyn Any>>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                scheduler,
                hooks,
                hint,
                duration: 0.0,
                start_time: 0.0,
                running: false,
                started: false,
                run_id: 0,
                handle: None,
            })),
        }
    }

    /// Run the animation for `duration` milliseconds, starting now.
    ///
    /// Equivalent to [`run_at`] with the scheduler's current time.
    ///
    /// [`run_at`]: Animation::run_at
    pub fn run(&self, duration: f64) {
        let now = self.inner.borrow().scheduler.now();
        self.run_at(duration, now);
    }

    /// Run the animation for `duration` milliseconds, beginning at
    /// `start_time`.
    ///
    /// The start time may lie in the past or the future. When the whole
    /// animation already lies in the past, it runs to completion
    /// synchronously within this call: start and completion hooks fire and
    /// the animation is idle before this method returns, without touching
    /// the scheduler. Otherwise the call returns immediately with the
    /// animation running and a tick scheduled.
    ///
    /// If the animation is already running, the previous run is cancelled
    /// first (firing [`AnimationHooks::on_cancel`]).
    ///
    /// ## Panics
    ///
    /// Panics if `duration` is negative.
    pub fn run_at(&self, duration: f64, start_time: f64) {
        assert!(duration >= 0.0, "animation duration must be non-negative");
        self.cancel();

        let (now, run_id) = {
            let mut inner = self.inner.borrow_mut();
            // A hook re-entering from the cancel above may have left a
            // pending request behind; this run owns the handle slot.
            if let Some(mut handle) = inner.handle.take() {
                handle.cancel();
            }
            inner.duration = duration;
            inner.start_time = start_time;
            inner.running = true;
            inner.started = false;
            inner.run_id += 1;
            (inner.scheduler.now(), inner.run_id)
        };

        // The whole animation lies in the past: run to completion
        // synchronously, with no scheduler interaction.
        if start_time <= now && now - start_time >= duration {
            self.inner.borrow_mut().started = true;
            self.hooks().on_start(self);
            if self.is_current(run_id) {
                self.finish();
            }
            return;
        }

        self.schedule_tick();
    }

    /// Cancel the animation.
    ///
    /// The pending tick (if any) is revoked, the animation becomes idle,
    /// and [`AnimationHooks::on_cancel`] fires. Once this returns, no
    /// further hook for this run will fire. Cancelling an animation that
    /// is not running is a no-op and does not fire the cancellation hook.
    pub fn cancel(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.running {
                return;
            }
            inner.running = false;
            inner.started = false;
            if let Some(mut handle) = inner.handle.take() {
                handle.cancel();
            }
        }
        self.hooks().on_cancel(self);
    }

    /// Check whether the animation is currently running.
    ///
    /// True from the moment [`run`] accepts until completion or
    /// cancellation, including the window before a future start time is
    /// reached.
    ///
    /// [`run`]: Animation::run
    #[inline]
    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }

    /// Request the next tick from the scheduler and store its handle.
    fn schedule_tick(&self) {
        let (scheduler, hint, run_id) = {
            let inner = self.inner.borrow();
            (Rc::clone(&inner.scheduler), inner.hint.clone(), inner.run_id)
        };

        let weak = Rc::downgrade(&self.inner);
        let callback: FrameCallback = Box::new(move |timestamp| {
            if let Some(inner) = weak.upgrade() {
                Animation { inner }.tick(timestamp, run_id);
            }
        });

        let handle = scheduler.request_animation_frame(callback, hint.as_deref());
        self.inner.borrow_mut().handle = Some(handle);
    }

    /// Advance the animation for a frame at `timestamp`.
    ///
    /// State is committed before any hook runs, so hooks re-entering
    /// `run`/`cancel` see the post-transition state and their own
    /// scheduling is never overwritten afterward.
    fn tick(&self, timestamp: f64, run_id: u64) {
        let step = {
            let mut inner = self.inner.borrow_mut();
            // The run this tick was scheduled for may have been cancelled,
            // completed, or replaced in the meantime.
            if !inner.running || inner.run_id != run_id {
                return;
            }
            inner.handle = None;

            let end = inner.start_time + inner.duration;
            if timestamp < inner.start_time {
                Tick::NotYet
            } else if !inner.started {
                inner.started = true;
                Tick::Start {
                    also_complete: timestamp >= end,
                }
            } else if timestamp < end {
                let fraction =
                    ((timestamp - inner.start_time) / inner.duration).clamp(0.0, 1.0);
                Tick::Update(fraction)
            } else {
                Tick::Complete
            }
        };

        match step {
            Tick::NotYet => self.schedule_tick(),
            Tick::Start { also_complete } => {
                self.hooks().on_start(self);
                if !self.is_current(run_id) {
                    return;
                }
                if also_complete {
                    self.finish();
                } else {
                    self.schedule_tick();
                }
            }
            Tick::Update(fraction) => {
                let hooks = self.hooks();
                hooks.on_update(self, hooks.interpolate(fraction));
                if self.is_current(run_id) {
                    self.schedule_tick();
                }
            }
            Tick::Complete => self.finish(),
        }
    }

    /// Transition to idle and fire the completion hook.
    fn finish(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.running = false;
            inner.started = false;
            inner.handle = None;
        }
        self.hooks().on_complete(self);
    }

    fn hooks(&self) -> Rc<dyn AnimationHooks> {
        Rc::clone(&self.inner.borrow().hooks)
    }

    /// Check that the given run is still the live one (hooks may have
    /// cancelled or restarted the animation).
    fn is_current(&self, run_id: u64) -> bool {
        let inner = self.inner.borrow();
        inner.running && inner.run_id == run_id
    }
}
