//! Frame scheduling callback.

/// Callback used by the engine to request rendering frames from the host
/// event loop.
///
/// While any animator is pending or running, every call to
/// [`CameraRig::animate`](crate::CameraRig::animate) requests one more
/// frame, so the host keeps ticking until all animations settle.
pub trait Messenger {
    /// Requests one more rendering frame from the host.
    fn request_redraw(&self);
}

/// Messenger that ignores all requests.
///
/// Useful for tests and for hosts that run a continuous render loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyMessenger;

impl Messenger for DummyMessenger {
    fn request_redraw(&self) {}
}
