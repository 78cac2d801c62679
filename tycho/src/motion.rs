//! Factories for the high-level camera motions.
//!
//! Each function here turns a camera gesture into a set of
//! [`CameraAnimator`]s and has no side effects of its own. The rig methods
//! of the same names register and start the returned set; hosts that need
//! custom orchestration can call these directly and feed the animators to
//! [`CameraRig::add_animator`](crate::CameraRig::add_animator).

use std::rc::Rc;
use std::time::Duration;

use tycho_types::geo::GeoPoint;
use tycho_types::mercator;
use tycho_types::{CameraOptions, CameraState, ScreenPoint, ScreenVector, Size};

use crate::animator::{
    CameraAnimator, CameraAnimatorType, CameraValue, DEFAULT_ANIMATION_DURATION,
};
use crate::easing::Easing;
use crate::error::TychoError;
use crate::listener::AnimatorStatusListener;
use crate::transform::{offset_center, rotation_between};

/// Lowest zoom level the motion factories produce.
pub const MIN_ZOOM: f64 = 0.0;
/// Highest zoom level the motion factories produce.
pub const MAX_ZOOM: f64 = 25.5;
/// Lowest pitch in degrees the motion factories produce.
pub const MIN_PITCH: f64 = 0.0;
/// Highest pitch in degrees the motion factories produce.
pub const MAX_PITCH: f64 = 85.0;

/// Curvature of the fly-to flight path.
///
/// The value 1.42 is the average preferred by participants in the user
/// study of van Wijk & Nuij, "Smooth and efficient zooming and panning"
/// (InfoVis 2003).
const FLY_TO_RHO: f64 = 1.42;

/// Timing overrides for one animated property of a motion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropertyOverride {
    duration: Option<Duration>,
    start_delay: Option<Duration>,
    easing: Option<Easing>,
}

impl PropertyOverride {
    /// Creates an empty override that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the duration for the property.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Overrides the start delay for the property.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Overrides the easing curve for the property.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

/// Configuration shared by the animators of one high-level motion.
#[derive(Clone, Default)]
pub struct AnimationOptions {
    owner: Option<String>,
    duration: Option<Duration>,
    start_delay: Option<Duration>,
    easing: Option<Easing>,
    overrides: Vec<(CameraAnimatorType, PropertyOverride)>,
    animator_listener: Option<Rc<dyn AnimatorStatusListener>>,
}

impl AnimationOptions {
    /// Creates options with the default duration, no delay, and the
    /// default easing curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the owner tag carried by every animator of the motion.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the duration of the motion.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the delay before the motion begins.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Sets the easing curve of the motion.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Overrides duration, delay, or easing for one animated property.
    /// Properties without an override use the motion-level values.
    pub fn with_property_override(
        mut self,
        animator_type: CameraAnimatorType,
        property_override: PropertyOverride,
    ) -> Self {
        self.overrides.push((animator_type, property_override));
        self
    }

    /// Attaches a status listener that reports the motion as a whole: it
    /// sees one start and one terminal notification for the whole set.
    pub fn with_animator_listener(mut self, listener: Rc<dyn AnimatorStatusListener>) -> Self {
        self.animator_listener = Some(listener);
        self
    }

    /// Owner tag of the motion.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Effective motion-level duration.
    pub fn duration(&self) -> Duration {
        self.duration.unwrap_or(DEFAULT_ANIMATION_DURATION)
    }

    /// The attached motion status listener, if any.
    pub fn animator_listener(&self) -> Option<&Rc<dyn AnimatorStatusListener>> {
        self.animator_listener.as_ref()
    }

    fn resolve(&self, animator_type: &CameraAnimatorType) -> (Duration, Duration, Easing) {
        let property = self
            .overrides
            .iter()
            .rev()
            .find(|(t, _)| t == animator_type)
            .map(|(_, o)| o);
        (
            property
                .and_then(|o| o.duration)
                .or(self.duration)
                .unwrap_or(DEFAULT_ANIMATION_DURATION),
            property
                .and_then(|o| o.start_delay)
                .or(self.start_delay)
                .unwrap_or(Duration::ZERO),
            property
                .and_then(|o| o.easing)
                .or(self.easing)
                .unwrap_or_default(),
        )
    }
}

fn configure<T: Into<CameraValue> + Copy>(
    builder: crate::animator::CameraAnimatorBuilder<T>,
    animator_type: &CameraAnimatorType,
    options: &AnimationOptions,
) -> crate::animator::CameraAnimatorBuilder<T> {
    let (duration, delay, easing) = options.resolve(animator_type);
    let builder = builder
        .with_duration(duration)
        .with_start_delay(delay)
        .with_easing(easing);
    match options.owner() {
        Some(owner) => builder.with_owner(owner),
        None => builder,
    }
}

/// Creates animators that ease each property present in `target` from its
/// current value to the target value.
///
/// Bearing eases through the shortest rotation. A present anchor becomes a
/// constant anchor animator that pins the pivot for the duration of the
/// motion.
pub fn ease_to(
    state: &CameraState,
    target: &CameraOptions,
    options: &AnimationOptions,
) -> Result<Vec<CameraAnimator>, TychoError> {
    if target.is_empty() {
        return Err(TychoError::InvalidAnimator(
            "ease expects at least one camera property to animate".to_string(),
        ));
    }

    let mut animators = Vec::new();
    if let Some(center) = target.center() {
        animators.push(
            configure(
                CameraAnimator::center([center]).with_start_value(state.center()),
                &CameraAnimatorType::Center,
                options,
            )
            .build()?,
        );
    }
    if let Some(zoom) = target.zoom() {
        animators.push(
            configure(
                CameraAnimator::zoom([zoom]).with_start_value(state.zoom()),
                &CameraAnimatorType::Zoom,
                options,
            )
            .build()?,
        );
    }
    if let Some(bearing) = target.bearing() {
        animators.push(
            configure(
                CameraAnimator::bearing([bearing]).with_start_value(state.bearing()),
                &CameraAnimatorType::Bearing,
                options,
            )
            .build()?,
        );
    }
    if let Some(pitch) = target.pitch() {
        animators.push(
            configure(
                CameraAnimator::pitch([pitch]).with_start_value(state.pitch()),
                &CameraAnimatorType::Pitch,
                options,
            )
            .build()?,
        );
    }
    if let Some(padding) = target.padding() {
        animators.push(
            configure(
                CameraAnimator::padding([padding]).with_start_value(state.padding()),
                &CameraAnimatorType::Padding,
                options,
            )
            .build()?,
        );
    }
    if let Some(anchor) = target.anchor() {
        animators.push(
            configure(
                CameraAnimator::anchor([anchor]).with_start_value(anchor),
                &CameraAnimatorType::Anchor,
                options,
            )
            .build()?,
        );
    }
    Ok(animators)
}

/// Creates animators that fly the camera along a zoom-out/zoom-in curve to
/// the target.
///
/// Center and zoom follow the smooth flight path of van Wijk & Nuij, which
/// widens the view in the middle of long flights so the eye keeps context.
/// Bearing, pitch, and padding ease linearly alongside. A target anchor is
/// ignored. When the flight would be degenerate (the centers coincide at
/// equal zooms) the motion falls back to a plain ease.
pub fn fly_to(
    state: &CameraState,
    target: &CameraOptions,
    size: Size,
    options: &AnimationOptions,
) -> Result<Vec<CameraAnimator>, TychoError> {
    if target.is_empty() {
        return Err(TychoError::InvalidAnimator(
            "fly expects at least one camera property to animate".to_string(),
        ));
    }
    if size.is_zero() {
        return Err(TychoError::InvalidAnimator(
            "fly needs a non-empty viewport size".to_string(),
        ));
    }
    for (name, value) in [
        ("zoom", target.zoom()),
        ("bearing", target.bearing()),
        ("pitch", target.pitch()),
    ] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(TychoError::InvalidAnimator(format!(
                "fly target {name} is not finite"
            )));
        }
    }
    if target
        .center()
        .is_some_and(|c| !(c.lat().is_finite() && c.lon().is_finite()))
    {
        return Err(TychoError::InvalidAnimator(
            "fly target center is not finite".to_string(),
        ));
    }

    let center_start = state.center();
    let center_end = target.center().unwrap_or(center_start);
    let z0 = state.zoom();
    let z1 = target.zoom().unwrap_or(z0);

    let rho = FLY_TO_RHO;
    let rho2 = rho * rho;
    let w0 = size.width().max(size.height());
    let w1 = w0 / 2f64.powf(z1 - z0);
    let from = mercator::project(&center_start, z0);
    let to = mercator::project(&center_end, z0);
    let u1 = (to - from).norm();

    // r(i) of the paper, the hyperbolic parameter at the two endpoints.
    let r = |i: usize| -> f64 {
        let sign = if i == 0 { 1.0 } else { -1.0 };
        let denom = 2.0 * (if i == 0 { w0 } else { w1 }) * rho2 * u1;
        let b = (w1 * w1 - w0 * w0 + sign * rho2 * rho2 * u1 * u1) / denom;
        ((b * b + 1.0).sqrt() - b).ln()
    };

    let r0 = r(0);
    let mut s_total = (r(1) - r0) / rho;

    // Exponent of the pure-zoom fallback; the flight degenerates when the
    // centers coincide in projected space.
    let mut pure_zoom = None;
    if u1 < 1e-6 || !s_total.is_finite() {
        if (w0 - w1).abs() < 1e-6 {
            return ease_to(state, target, options);
        }
        let direction = if w1 < w0 { -1.0 } else { 1.0 };
        s_total = (w1 / w0).ln().abs() / rho;
        pure_zoom = Some(direction);
    }

    // Normalized visible span w(s)/w0 and travelled fraction u(s)/u1.
    let width_at = move |s: f64| -> f64 {
        match pure_zoom {
            Some(direction) => (direction * rho * s).exp(),
            None => r0.cosh() / (r0 + rho * s).cosh(),
        }
    };
    let travelled_at = move |s: f64| -> f64 {
        match pure_zoom {
            Some(_) => 0.0,
            None => w0 * ((r0.cosh() * (r0 + rho * s).tanh() - r0.sinh()) / rho2) / u1,
        }
    };

    let zoom_path = move |k: f64| {
        if k >= 1.0 {
            return CameraValue::Scalar(z1);
        }
        let width = width_at(k * s_total);
        CameraValue::Scalar(z0 + (1.0 / width).log2())
    };
    let center_path = move |k: f64| {
        if k >= 1.0 {
            return CameraValue::Point(center_end);
        }
        let world = from + (to - from) * travelled_at(k * s_total);
        CameraValue::Point(mercator::unproject(&world, z0))
    };

    let (center_duration, center_delay, center_easing) =
        options.resolve(&CameraAnimatorType::Center);
    let (zoom_duration, zoom_delay, zoom_easing) = options.resolve(&CameraAnimatorType::Zoom);
    let mut animators = vec![
        CameraAnimator::from_path(
            CameraAnimatorType::Center,
            Box::new(center_path),
            center_duration,
            center_delay,
            center_easing,
            options.owner.clone(),
        ),
        CameraAnimator::from_path(
            CameraAnimatorType::Zoom,
            Box::new(zoom_path),
            zoom_duration,
            zoom_delay,
            zoom_easing,
            options.owner.clone(),
        ),
    ];

    if let Some(bearing) = target.bearing() {
        animators.push(
            configure(
                CameraAnimator::bearing([bearing]).with_start_value(state.bearing()),
                &CameraAnimatorType::Bearing,
                options,
            )
            .build()?,
        );
    }
    if let Some(pitch) = target.pitch() {
        animators.push(
            configure(
                CameraAnimator::pitch([pitch]).with_start_value(state.pitch()),
                &CameraAnimatorType::Pitch,
                options,
            )
            .build()?,
        );
    }
    if let Some(padding) = target.padding() {
        animators.push(
            configure(
                CameraAnimator::padding([padding]).with_start_value(state.padding()),
                &CameraAnimatorType::Padding,
                options,
            )
            .build()?,
        );
    }
    Ok(animators)
}

/// Creates an animator that pans the map by a screen-space delta.
///
/// A positive `x` moves the content towards the east side of the screen
/// and a positive `y` moves it down; the delta is interpreted under the
/// current bearing.
pub fn move_by(
    state: &CameraState,
    delta: ScreenVector,
    options: &AnimationOptions,
) -> Result<Vec<CameraAnimator>, TychoError> {
    if !(delta.x.is_finite() && delta.y.is_finite()) {
        return Err(TychoError::InvalidAnimator(
            "move delta is not finite".to_string(),
        ));
    }

    let center = offset_center(&state.center(), state.zoom(), state.bearing(), delta);
    Ok(vec![configure(
        CameraAnimator::center([center]).with_start_value(state.center()),
        &CameraAnimatorType::Center,
        options,
    )
    .build()?])
}

/// Creates animators that multiply the camera scale by `amount`, zooming
/// about the optional anchor point.
///
/// `amount` must be positive and finite; 2.0 zooms in by one level, 0.5
/// zooms out by one. The resulting zoom is clamped to
/// [`MIN_ZOOM`]..=[`MAX_ZOOM`].
pub fn scale_by(
    state: &CameraState,
    amount: f64,
    anchor: Option<ScreenPoint>,
    options: &AnimationOptions,
) -> Result<Vec<CameraAnimator>, TychoError> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(TychoError::InvalidAnimator(format!(
            "scale amount must be positive and finite, got {amount}"
        )));
    }

    let zoom = (state.zoom() + amount.log2()).clamp(MIN_ZOOM, MAX_ZOOM);
    let mut animators = vec![configure(
        CameraAnimator::zoom([zoom]).with_start_value(state.zoom()),
        &CameraAnimatorType::Zoom,
        options,
    )
    .build()?];
    if let Some(anchor) = anchor {
        animators.push(
            configure(
                CameraAnimator::anchor([anchor]).with_start_value(anchor),
                &CameraAnimatorType::Anchor,
                options,
            )
            .build()?,
        );
    }
    Ok(animators)
}

/// Creates an animator that rotates the bearing by the angle between two
/// screen points as seen from the viewport center.
pub fn rotate_by(
    state: &CameraState,
    first: ScreenPoint,
    second: ScreenPoint,
    size: Size,
    options: &AnimationOptions,
) -> Result<Vec<CameraAnimator>, TychoError> {
    for (name, point) in [("first", first), ("second", second)] {
        if !(point.x.is_finite() && point.y.is_finite()) {
            return Err(TychoError::InvalidAnimator(format!(
                "rotate {name} point is not finite"
            )));
        }
    }

    let bearing = state.bearing() + rotation_between(size, first, second);
    Ok(vec![configure(
        CameraAnimator::bearing([bearing]).with_start_value(state.bearing()),
        &CameraAnimatorType::Bearing,
        options,
    )
    .build()?])
}

/// Creates an animator that tilts the camera by `delta` degrees, clamped
/// to [`MIN_PITCH`]..=[`MAX_PITCH`].
pub fn pitch_by(
    state: &CameraState,
    delta: f64,
    options: &AnimationOptions,
) -> Result<Vec<CameraAnimator>, TychoError> {
    if !delta.is_finite() {
        return Err(TychoError::InvalidAnimator(
            "pitch delta is not finite".to_string(),
        ));
    }

    let pitch = (state.pitch() + delta).clamp(MIN_PITCH, MAX_PITCH);
    Ok(vec![configure(
        CameraAnimator::pitch([pitch]).with_start_value(state.pitch()),
        &CameraAnimatorType::Pitch,
        options,
    )
    .build()?])
}
