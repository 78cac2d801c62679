//! Easing curves for animator interpolation.

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 32;
const SOLVER_PRECISION: f64 = 1e-7;

/// Easing curve applied to the time fraction of an animator.
///
/// The curve maps the raw fraction `0..=1` of elapsed time to the fraction
/// of the animated value's path that should be covered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Quadratic acceleration from rest.
    QuadraticIn,
    /// Quadratic deceleration to rest.
    QuadraticOut,
    /// Quadratic acceleration into quadratic deceleration.
    QuadraticInOut,
    /// Cubic Bezier timing curve through the two given control points.
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Curve that leaves the start quickly and settles into the target
    /// slowly. The default for camera movements.
    pub const FAST_OUT_SLOW_IN: Easing = Easing::CubicBezier(0.4, 0.0, 0.2, 1.0);

    /// Applies the curve to a time fraction.
    ///
    /// Input outside of `0..=1` is clamped before the curve is evaluated.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let t = t - 1.0;
                    1.0 - 2.0 * t * t
                }
            }
            Easing::CubicBezier(p1x, p1y, p2x, p2y) => bezier(p1x, p1y, p2x, p2y, t),
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::FAST_OUT_SLOW_IN
    }
}

/// Evaluates one coordinate of a cubic Bezier with endpoints at 0 and 1.
fn bezier_coordinate(p1: f64, p2: f64, u: f64) -> f64 {
    let omu = 1.0 - u;
    3.0 * p1 * u * omu * omu + 3.0 * p2 * u * u * omu + u * u * u
}

fn bezier_derivative(p1: f64, p2: f64, u: f64) -> f64 {
    let omu = 1.0 - u;
    3.0 * p1 * omu * (omu - 2.0 * u) + 3.0 * p2 * u * (2.0 * omu - u) + 3.0 * u * u
}

/// Solves `x(u) = x` for the curve parameter, then evaluates `y(u)`.
fn bezier(p1x: f64, p1y: f64, p2x: f64, p2y: f64, x: f64) -> f64 {
    if x == 0.0 || x == 1.0 {
        return x;
    }

    let mut u = x;
    for _ in 0..NEWTON_ITERATIONS {
        let error = bezier_coordinate(p1x, p2x, u) - x;
        if error.abs() < SOLVER_PRECISION {
            return bezier_coordinate(p1y, p2y, u);
        }
        let slope = bezier_derivative(p1x, p2x, u);
        if slope.abs() < SOLVER_PRECISION {
            break;
        }
        u -= error / slope;
        u = u.clamp(0.0, 1.0);
    }

    let mut low = 0.0;
    let mut high = 1.0;
    u = x;
    for _ in 0..BISECTION_ITERATIONS {
        let error = bezier_coordinate(p1x, p2x, u) - x;
        if error.abs() < SOLVER_PRECISION {
            break;
        }
        if error > 0.0 {
            high = u;
        } else {
            low = u;
        }
        u = (low + high) / 2.0;
    }

    bezier_coordinate(p1y, p2y, u)
}
