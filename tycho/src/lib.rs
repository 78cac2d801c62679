//! Tycho is a camera animation engine for interactive maps. It coordinates
//! animated changes of the camera center, zoom, bearing, pitch, and padding,
//! keeps concurrent animations from fighting over the camera, and tells the
//! host map when the camera moves on behalf of the user.
//!
//! # Quick start
//!
//! The engine talks to a map through two small traits. Implement them over
//! your map's camera, create a [`CameraRig`], and drive it with your frame
//! clock:
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use tycho::delegate::{MapCamera, MapTransform};
//! use tycho::error::TychoError;
//! use tycho::{AnimationOptions, CameraRig};
//! use tycho_types::{latlon, CameraOptions, CameraState, Size};
//! use web_time::SystemTime;
//!
//! #[derive(Clone)]
//! struct SharedCamera(Rc<RefCell<CameraState>>);
//!
//! impl MapCamera for SharedCamera {
//!     fn state(&self) -> CameraState {
//!         *self.0.borrow()
//!     }
//!
//!     fn set_camera(&mut self, options: &CameraOptions) -> Result<(), TychoError> {
//!         let next = self.0.borrow().apply(options);
//!         *self.0.borrow_mut() = next;
//!         Ok(())
//!     }
//! }
//!
//! struct Viewport;
//!
//! impl MapTransform for Viewport {
//!     fn set_user_animation_in_progress(&mut self, _in_progress: bool) {}
//!
//!     fn size(&self) -> Size {
//!         Size::new(800.0, 600.0)
//!     }
//! }
//!
//! # fn main() -> Result<(), TychoError> {
//! let state = Rc::new(RefCell::new(CameraState::default()));
//! let mut rig = CameraRig::new(SharedCamera(state.clone()), Viewport);
//!
//! let target = CameraOptions::new()
//!     .with_center(latlon!(48.8566, 2.3522))
//!     .with_zoom(11.0);
//! rig.ease_to(
//!     &target,
//!     &AnimationOptions::new().with_duration(Duration::from_millis(300)),
//! )?;
//!
//! let start = SystemTime::now();
//! for frame in 0..=30u64 {
//!     rig.animate(start + Duration::from_millis(frame * 10))?;
//! }
//!
//! assert_eq!(state.borrow().zoom(), 11.0);
//! assert_eq!(state.borrow().center(), latlon!(48.8566, 2.3522));
//! # Ok(())
//! # }
//! ```
//!
//! # Main components
//!
//! Everything in the engine revolves around
//!
//! * the [`CameraRig`], which owns the animators, runs their shared clock,
//!   merges their values into camera writes, and fans out notifications, and
//! * [`CameraAnimator`]s, which each interpolate one camera property over
//!   time. Build them directly for full control, or let the
//!   [`motion`] factories build whole sets for common gestures like easing,
//!   flying, panning, and pinch zooming.
//!
//! The rig never touches your map directly. It goes through the
//! [`delegate`](crate::delegate) traits for camera reads and writes, and
//! through an optional [`Messenger`] to request redraws while animations
//! run. Everything the rig does can be observed through the
//! [`listener`](crate::listener) traits, and every listener receives the
//! rig back, so animations can be chained from inside callbacks.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod animator;
pub mod delegate;
mod easing;
pub mod error;
pub mod listener;
mod messenger;
pub mod motion;
mod rig;
#[cfg(test)]
mod tests;
pub mod transform;

pub use animator::{
    AnimatorState, CameraAnimator, CameraAnimatorBuilder, CameraAnimatorType, CameraValue,
    DEFAULT_ANIMATION_DURATION,
};
pub use easing::Easing;
pub use messenger::{DummyMessenger, Messenger};
pub use motion::{AnimationOptions, PropertyOverride};
pub use rig::{AnimationHandle, AnimatorId, CameraRig};

// Reexport tycho_types
pub use tycho_types;
