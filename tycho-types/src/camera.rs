//! Camera state snapshots and partial camera updates.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint2d;
use crate::screen::ScreenPoint;

/// Insets from the viewport edges, in pixels.
///
/// Padding shifts the logical center of the camera away from the geometric
/// center of the viewport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    top: f64,
    left: f64,
    bottom: f64,
    right: f64,
}

impl Padding {
    /// Creates a new set of insets.
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Inset from the top edge.
    pub fn top(&self) -> f64 {
        self.top
    }

    /// Inset from the left edge.
    pub fn left(&self) -> f64 {
        self.left
    }

    /// Inset from the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    /// Inset from the right edge.
    pub fn right(&self) -> f64 {
        self.right
    }

    /// Insets at the fraction `t` between `self` and `other`.
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        Self {
            top: self.top + (other.top - self.top) * t,
            left: self.left + (other.left - self.left) * t,
            bottom: self.bottom + (other.bottom - self.bottom) * t,
            right: self.right + (other.right - self.right) * t,
        }
    }

    /// Returns true if every inset is finite and not negative.
    pub fn is_valid(&self) -> bool {
        [self.top, self.left, self.bottom, self.right]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Read-only snapshot of the map camera.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    center: GeoPoint2d,
    padding: Padding,
    zoom: f64,
    bearing: f64,
    pitch: f64,
}

impl CameraState {
    /// Creates a new camera snapshot.
    pub fn new(center: GeoPoint2d, padding: Padding, zoom: f64, bearing: f64, pitch: f64) -> Self {
        Self {
            center,
            padding,
            zoom,
            bearing,
            pitch,
        }
    }

    /// Geographic point at the logical center of the viewport.
    pub fn center(&self) -> GeoPoint2d {
        self.center
    }

    /// Viewport insets.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Rotation of the map around its center, in degrees clockwise from
    /// north.
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Tilt of the camera from the vertical, in degrees.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Snapshot with the fields present in `options` replaced.
    ///
    /// The anchor field of the options is a write pivot, not camera state,
    /// so it does not participate in the overlay.
    pub fn apply(&self, options: &CameraOptions) -> CameraState {
        CameraState {
            center: options.center.unwrap_or(self.center),
            padding: options.padding.unwrap_or(self.padding),
            zoom: options.zoom.unwrap_or(self.zoom),
            bearing: options.bearing.unwrap_or(self.bearing),
            pitch: options.pitch.unwrap_or(self.pitch),
        }
    }
}

/// Partial camera update.
///
/// Fields set to `None` leave the corresponding part of the camera
/// unchanged. The `anchor` field, when present, asks the engine to apply
/// the update about the given screen point instead of the viewport center.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraOptions {
    center: Option<GeoPoint2d>,
    padding: Option<Padding>,
    anchor: Option<ScreenPoint>,
    zoom: Option<f64>,
    bearing: Option<f64>,
    pitch: Option<f64>,
}

impl CameraOptions {
    /// Creates an empty update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target center.
    pub fn with_center(mut self, center: GeoPoint2d) -> Self {
        self.center = Some(center);
        self
    }

    /// Sets the target padding.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Sets the screen point about which the update is applied.
    pub fn with_anchor(mut self, anchor: ScreenPoint) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Sets the target zoom level.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Sets the target bearing in degrees.
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    /// Sets the target pitch in degrees.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Target center, if present.
    pub fn center(&self) -> Option<GeoPoint2d> {
        self.center
    }

    /// Target padding, if present.
    pub fn padding(&self) -> Option<Padding> {
        self.padding
    }

    /// Update pivot, if present.
    pub fn anchor(&self) -> Option<ScreenPoint> {
        self.anchor
    }

    /// Target zoom, if present.
    pub fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    /// Target bearing, if present.
    pub fn bearing(&self) -> Option<f64> {
        self.bearing
    }

    /// Target pitch, if present.
    pub fn pitch(&self) -> Option<f64> {
        self.pitch
    }

    /// Returns true if no field is present.
    pub fn is_empty(&self) -> bool {
        self.center.is_none()
            && self.padding.is_none()
            && self.anchor.is_none()
            && self.zoom.is_none()
            && self.bearing.is_none()
            && self.pitch.is_none()
    }
}
