//! Integration traits implemented by the host map engine.
//!
//! The animation engine does not render anything itself. It reads and
//! writes camera state through [`MapCamera`] and reports animation activity
//! through [`MapTransform`]; the host engine implements both over whatever
//! rendering stack it uses.

use tycho_types::{CameraOptions, CameraState, Size};

use crate::error::TychoError;

/// Camera access provided by the host map engine.
pub trait MapCamera {
    /// Current camera snapshot.
    fn state(&self) -> CameraState;

    /// Applies a partial camera update.
    ///
    /// The update carries at most one animated property plus an optional
    /// anchor pivot. Returning an error aborts the remainder of the current
    /// tick and propagates to the caller of the engine.
    fn set_camera(&mut self, options: &CameraOptions) -> Result<(), TychoError>;
}

/// Viewport information and animation progress callbacks provided by the
/// host map engine.
pub trait MapTransform {
    /// Called with `true` every time a registered animator begins and with
    /// `false` when the last running registered animator terminates.
    fn set_user_animation_in_progress(&mut self, in_progress: bool);

    /// Current viewport size in pixels.
    fn size(&self) -> Size;
}
