//! Geographic points on the surface of the Earth.

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

/// Position on the map expressed in geographic coordinates.
///
/// Host engines can implement this trait for their own point types to pass
/// them into camera operations without conversion.
pub trait GeoPoint {
    /// Latitude in degrees, positive to the north.
    fn lat(&self) -> f64;
    /// Longitude in degrees, positive to the east.
    fn lon(&self) -> f64;
}

/// Geographic point given as a (latitude, longitude) pair in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint2d {
    lat: f64,
    lon: f64,
}

impl GeoPoint2d {
    /// Creates a new point from latitude and longitude in degrees.
    pub fn latlon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a point with the same coordinates as the given one.
    pub fn from(other: &impl GeoPoint) -> Self {
        Self {
            lat: other.lat(),
            lon: other.lon(),
        }
    }

    /// Point at the fraction `t` of the straight coordinate-space segment
    /// between `self` and `other`.
    ///
    /// `t == 0.0` gives `self`, `t == 1.0` gives `other`. Values outside of
    /// `0..=1` extrapolate along the same line.
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }
}

impl GeoPoint for GeoPoint2d {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

impl AbsDiffEq for GeoPoint2d {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.lat.abs_diff_eq(&other.lat, epsilon) && self.lon.abs_diff_eq(&other.lon, epsilon)
    }
}

impl RelativeEq for GeoPoint2d {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.lat.relative_eq(&other.lat, epsilon, max_relative)
            && self.lon.relative_eq(&other.lon, epsilon, max_relative)
    }
}

/// Constructs a [`GeoPoint2d`](crate::geo::GeoPoint2d) from latitude and
/// longitude in degrees.
///
/// ```
/// use tycho_types::latlon;
/// use tycho_types::geo::GeoPoint;
///
/// let point = latlon!(52.52, 13.405);
/// assert_eq!(point.lat(), 52.52);
/// ```
#[macro_export]
macro_rules! latlon {
    ($lat:expr, $lon:expr) => {
        $crate::geo::GeoPoint2d::latlon($lat, $lon)
    };
}
