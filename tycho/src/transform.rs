//! Geometry helpers shared by the camera motion operations.

use tycho_types::mercator;
use tycho_types::{GeoPoint2d, ScreenPoint, ScreenVector, Size};

/// Wraps a bearing into the `[0, 360)` degree range.
pub fn normalize_bearing(bearing: f64) -> f64 {
    bearing.rem_euclid(360.0)
}

/// Signed rotation in degrees that reaches `to` from `from` through the
/// shorter arc.
///
/// The result lies in `(-180, 180]`. Adding it to `from` gives an
/// unwrapped bearing equal to `to` modulo 360.
pub fn shortest_rotation(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Center that puts the map content `delta` screen pixels away from where
/// `center` currently puts it.
///
/// The delta is given in screen coordinates (`x` to the right, `y` down)
/// and is rotated by the camera bearing before it is applied in projected
/// space. With a north-up camera, a positive `x` moves the center east and
/// a positive `y` moves it south.
pub fn offset_center(
    center: &GeoPoint2d,
    zoom: f64,
    bearing: f64,
    delta: ScreenVector,
) -> GeoPoint2d {
    let world = mercator::project(center, zoom);
    let angle = bearing.to_radians();
    let rotated = ScreenVector::new(
        delta.x * angle.cos() - delta.y * angle.sin(),
        delta.x * angle.sin() + delta.y * angle.cos(),
    );
    mercator::unproject(&(world + rotated), zoom)
}

/// Angle in degrees swept from `first` to `second` around the viewport
/// center, positive clockwise on screen.
pub fn rotation_between(size: Size, first: ScreenPoint, second: ScreenPoint) -> f64 {
    let center = size.center();
    let u = first - center;
    let v = second - center;
    let cross = u.x * v.y - u.y * v.x;
    let dot = u.x * v.x + u.y * v.y;
    cross.atan2(dot).to_degrees()
}
