//! Web Mercator world-pixel projection.
//!
//! At zoom level `z` the world maps onto a square of `TILE_SIZE * 2^z`
//! pixels. X grows eastward from the antimeridian, Y grows southward from
//! the north edge of the projection. These functions are the common ground
//! for converting between screen-space gestures and camera movements.

use crate::geo::{GeoPoint, GeoPoint2d};
use crate::screen::ScreenPoint;

/// Size of a map tile in pixels at every zoom level.
pub const TILE_SIZE: f64 = 512.0;

/// Highest latitude representable in the projection, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Side of the world square in pixels at the given zoom level.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Projects a geographic point into world pixels at the given zoom level.
///
/// Latitudes beyond [`MAX_LATITUDE`] are clamped to the edge of the
/// projection.
pub fn project(point: &GeoPoint2d, zoom: f64) -> ScreenPoint {
    let scale = world_size(zoom);
    let lat = point
        .lat()
        .clamp(-MAX_LATITUDE, MAX_LATITUDE)
        .to_radians();

    let x = (point.lon() + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * scale;
    ScreenPoint::new(x, y)
}

/// Inverse of [`project`] at the same zoom level.
pub fn unproject(point: &ScreenPoint, zoom: f64) -> GeoPoint2d {
    let scale = world_size(zoom);
    let lon = point.x / scale * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * point.y / scale);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint2d::latlon(lat, lon)
}
