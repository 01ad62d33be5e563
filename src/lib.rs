//! # frametick
//!
//! Frame-callback driven animation timing and lifecycle library.
//!
//! This crate provides a platform-agnostic state machine for time-based
//! animations:
//! - Running animations with a duration and an optional start time in the
//!   past or future
//! - Delivering start/update/complete/cancel events through per-instance
//!   hooks, with pluggable interpolation
//! - Scheduling frames through an injected [`AnimationScheduler`], so the
//!   host's frame-callback primitive stays swappable
//! - Driving animations deterministically in tests via
//!   [`testing::StubAnimationScheduler`]
//!
//! ## Features
//!
//! - `web` - Enable the browser-backed scheduler (`requestAnimationFrame`
//!   with a `setTimeout` fallback)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use frametick::{Animation, AnimationHooks};
//! use frametick::web;
//!
//! struct Slide;
//!
//! impl AnimationHooks for Slide {
//!     fn on_update(&self, _animation: &Animation, progress: f64) {
//!         // move something to `progress * target`
//!     }
//! }
//!
//! let scheduler = web::default_scheduler()?;
//! let animation = Animation::new(scheduler, Rc::new(Slide));
//! animation.run(250.0);
//! ```

mod animation;
mod scheduler;
pub mod testing;

pub use animation::{Animation, AnimationHooks};
pub use scheduler::{AnimationHandle, AnimationScheduler, FrameCallback};

#[cfg(feature = "web")]
pub use scheduler::web;
