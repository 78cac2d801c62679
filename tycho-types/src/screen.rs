//! Screen-space primitives.

use serde::{Deserialize, Serialize};

/// Point in viewport coordinates, in pixels with the origin at the top left
/// corner of the viewport.
pub type ScreenPoint = nalgebra::Point2<f64>;

/// Offset between two screen points, in pixels.
pub type ScreenVector = nalgebra::Vector2<f64>;

/// Size of a viewport in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    /// Creates a new size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width in pixels.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Point at the center of a viewport of this size.
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Returns true if either dimension is zero.
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}
