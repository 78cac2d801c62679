//! Error types used by the engine.

use thiserror::Error;

/// Error type returned by fallible camera animation operations.
#[derive(Debug, Error)]
pub enum TychoError {
    /// Animator configuration failed validation.
    #[error("invalid animator: {0}")]
    InvalidAnimator(String),

    /// The camera delegate rejected a camera write.
    #[error("camera write failed: {0}")]
    CameraWrite(String),
}
