//! Vocabulary types shared between the Tycho camera animation engine and the
//! host map engines it drives.
//!
//! This crate has no knowledge of animators or coordination. It defines the
//! values that cross the boundary between an application, the animation
//! engine, and a rendering engine:
//!
//! * [`GeoPoint2d`](geo::GeoPoint2d) and the [`GeoPoint`](geo::GeoPoint)
//!   trait for positions on the map.
//! * [`ScreenPoint`](screen::ScreenPoint) and [`Size`](screen::Size) for
//!   positions and extents in viewport pixels.
//! * [`CameraState`](camera::CameraState) and [`CameraOptions`](camera::CameraOptions)
//!   for full and partial camera descriptions.
//! * [`mercator`] for Web Mercator world-pixel projection math.

pub mod camera;
pub mod geo;
pub mod mercator;
pub mod screen;

pub use camera::{CameraOptions, CameraState, Padding};
pub use geo::{GeoPoint, GeoPoint2d};
pub use screen::{ScreenPoint, ScreenVector, Size};
