//! Listener traits for animator and camera observation.
//!
//! All callbacks receive the [`CameraRig`] that emitted the event as a
//! mutable argument, so a listener can start, cancel, or reconfigure
//! animations from inside the notification. The rig serializes all
//! notifications through an internal queue, so re-entrant calls are safe at
//! any point.

use crate::animator::{CameraAnimatorType, CameraValue};
use crate::rig::{AnimatorId, CameraRig};

/// Observes lifecycle transitions of all registered animators.
///
/// Transitions of unregistered animators are not reported. Observers are
/// held by the rig as `Rc<dyn CameraAnimationsLifecycleObserver>` and
/// removed by pointer identity.
pub trait CameraAnimationsLifecycleObserver {
    /// An animator began driving its property.
    fn on_animator_starting(
        &self,
        _rig: &mut CameraRig,
        _animator: AnimatorId,
        _animator_type: &CameraAnimatorType,
        _owner: Option<&str>,
    ) {
    }

    /// A starting animator is about to cancel the running animator of the
    /// same property type.
    fn on_animator_interrupting(
        &self,
        _rig: &mut CameraRig,
        _animator_type: &CameraAnimatorType,
        _running: AnimatorId,
        _running_owner: Option<&str>,
        _incoming: AnimatorId,
        _incoming_owner: Option<&str>,
    ) {
    }

    /// An animator completed its run.
    fn on_animator_ending(
        &self,
        _rig: &mut CameraRig,
        _animator: AnimatorId,
        _animator_type: &CameraAnimatorType,
        _owner: Option<&str>,
    ) {
    }

    /// An animator was cancelled before completing its run.
    fn on_animator_cancelling(
        &self,
        _rig: &mut CameraRig,
        _animator: AnimatorId,
        _animator_type: &CameraAnimatorType,
        _owner: Option<&str>,
    ) {
    }
}

/// Receives start, terminal, and repeat notifications for one animator.
///
/// A cancelled animator reports `on_animator_cancel` first and
/// `on_animator_end` right after it, so `on_animator_end` marks the end of
/// every run regardless of how it finished.
pub trait AnimatorStatusListener {
    /// The animator began producing values.
    fn on_animator_start(&self, _rig: &mut CameraRig, _animator: AnimatorId) {}

    /// The animator finished its run.
    fn on_animator_end(&self, _rig: &mut CameraRig, _animator: AnimatorId) {}

    /// The animator was cancelled.
    fn on_animator_cancel(&self, _rig: &mut CameraRig, _animator: AnimatorId) {}

    /// The animator completed one repeat cycle and started the next one.
    fn on_animator_repeat(&self, _rig: &mut CameraRig, _animator: AnimatorId) {}
}

/// Receives every value produced by one animator.
pub trait AnimatorUpdateListener {
    /// Called with each interpolated value, including the start value and
    /// the final one.
    fn on_animator_update(&self, rig: &mut CameraRig, animator: AnimatorId, value: &CameraValue);
}

impl<F: Fn(&mut CameraRig, AnimatorId, &CameraValue)> AnimatorUpdateListener for F {
    fn on_animator_update(&self, rig: &mut CameraRig, animator: AnimatorId, value: &CameraValue) {
        self(rig, animator, value)
    }
}

/// Receives every committed value of one camera property.
///
/// Committed means written to the camera delegate (or, for the anchor,
/// stored in the rig), regardless of which animator produced the value.
/// Consecutive equal values are reported once.
pub trait CameraChangeListener<T> {
    /// Called with each new committed value.
    fn on_camera_change(&self, rig: &mut CameraRig, value: &T);
}

impl<T, F: Fn(&mut CameraRig, &T)> CameraChangeListener<T> for F {
    fn on_camera_change(&self, rig: &mut CameraRig, value: &T) {
        self(rig, value)
    }
}
