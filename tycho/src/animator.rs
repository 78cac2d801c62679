//! Per-property camera animators.
//!
//! A [`CameraAnimator`] interpolates a single camera property from a start
//! value to one or more target values over a duration. Animators are built
//! through the typed constructors ([`CameraAnimator::zoom`],
//! [`CameraAnimator::center`] and so on), handed over to a
//! [`CameraRig`](crate::CameraRig), and driven by its ticks:
//!
//! 1. `start` arms the animator. With no start delay it begins immediately,
//!    otherwise it begins on the first tick at or after the delay elapses.
//! 2. While running, every tick produces one interpolated value.
//! 3. The run finishes as `Ended` when the last target is reached, or as
//!    `Cancelled` if it is stopped early. A finished animator can be
//!    started again.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use web_time::SystemTime;

use tycho_types::geo::GeoPoint;
use tycho_types::{GeoPoint2d, Padding, ScreenPoint};

use crate::easing::Easing;
use crate::error::TychoError;
use crate::listener::{AnimatorStatusListener, AnimatorUpdateListener};
use crate::transform::shortest_rotation;

/// Duration used by camera animations when none is configured.
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(300);

/// Identifies which camera property an animator drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CameraAnimatorType {
    /// Geographic center of the camera.
    Center,
    /// Zoom level.
    Zoom,
    /// Rotation around the viewport center, in degrees.
    Bearing,
    /// Tilt from the vertical, in degrees.
    Pitch,
    /// Viewport insets.
    Padding,
    /// Screen point used as the pivot for camera updates.
    Anchor,
    /// Application-defined scalar property animated alongside the camera.
    ///
    /// Custom animators never write camera state; their values reach only
    /// their own update listeners. They still take part in interruption
    /// (per name) and in the user-animation flag.
    Custom(String),
}

impl fmt::Display for CameraAnimatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraAnimatorType::Center => write!(f, "center"),
            CameraAnimatorType::Zoom => write!(f, "zoom"),
            CameraAnimatorType::Bearing => write!(f, "bearing"),
            CameraAnimatorType::Pitch => write!(f, "pitch"),
            CameraAnimatorType::Padding => write!(f, "padding"),
            CameraAnimatorType::Anchor => write!(f, "anchor"),
            CameraAnimatorType::Custom(name) => write!(f, "custom({name})"),
        }
    }
}

/// A value produced by a camera animator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraValue {
    /// Geographic position, produced by center animators.
    Point(GeoPoint2d),
    /// Scalar, produced by zoom, bearing, pitch, and custom animators.
    Scalar(f64),
    /// Viewport insets, produced by padding animators.
    Padding(Padding),
    /// Screen position, produced by anchor animators.
    Screen(ScreenPoint),
}

impl CameraValue {
    /// Value at the fraction `t` between `self` and `other`.
    ///
    /// Both values come from one animator, so they always share a variant;
    /// a foreign variant is returned unchanged.
    pub fn interpolate(&self, other: &CameraValue, t: f64) -> CameraValue {
        match (self, other) {
            (CameraValue::Point(a), CameraValue::Point(b)) => {
                CameraValue::Point(a.interpolate(b, t))
            }
            (CameraValue::Scalar(a), CameraValue::Scalar(b)) => {
                CameraValue::Scalar(a + (b - a) * t)
            }
            (CameraValue::Padding(a), CameraValue::Padding(b)) => {
                CameraValue::Padding(a.interpolate(b, t))
            }
            (CameraValue::Screen(a), CameraValue::Screen(b)) => {
                CameraValue::Screen(a + (b - a) * t)
            }
            _ => *other,
        }
    }

    /// Scalar payload, if this is a scalar value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            CameraValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    /// Point payload, if this is a geographic value.
    pub fn as_point(&self) -> Option<GeoPoint2d> {
        match self {
            CameraValue::Point(value) => Some(*value),
            _ => None,
        }
    }

    /// Padding payload, if this is an insets value.
    pub fn as_padding(&self) -> Option<Padding> {
        match self {
            CameraValue::Padding(value) => Some(*value),
            _ => None,
        }
    }

    /// Screen point payload, if this is a screen-space value.
    pub fn as_screen(&self) -> Option<ScreenPoint> {
        match self {
            CameraValue::Screen(value) => Some(*value),
            _ => None,
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            CameraValue::Point(p) => p.lat().is_finite() && p.lon().is_finite(),
            CameraValue::Scalar(v) => v.is_finite(),
            CameraValue::Padding(p) => p.is_valid(),
            CameraValue::Screen(p) => p.x.is_finite() && p.y.is_finite(),
        }
    }
}

impl From<GeoPoint2d> for CameraValue {
    fn from(value: GeoPoint2d) -> Self {
        CameraValue::Point(value)
    }
}

impl From<f64> for CameraValue {
    fn from(value: f64) -> Self {
        CameraValue::Scalar(value)
    }
}

impl From<Padding> for CameraValue {
    fn from(value: Padding) -> Self {
        CameraValue::Padding(value)
    }
}

impl From<ScreenPoint> for CameraValue {
    fn from(value: ScreenPoint) -> Self {
        CameraValue::Screen(value)
    }
}

/// Lifecycle state of an animator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorState {
    /// Created, re-usable after a finished run, or waiting for its start
    /// delay.
    Pending,
    /// Producing values.
    Running,
    /// Completed its run.
    Ended,
    /// Stopped before completing its run.
    Cancelled,
}

impl AnimatorState {
    /// Returns true for the `Ended` and `Cancelled` states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnimatorState::Ended | AnimatorState::Cancelled)
    }
}

/// How an animator maps its eased fraction to a value.
enum Trajectory {
    /// Piecewise-linear interpolation through the target legs.
    Legs(Vec<CameraValue>),
    /// Precomputed path evaluated at the eased fraction. Used by fly-to.
    Path(Box<dyn Fn(f64) -> CameraValue>),
}

/// Result of `CameraAnimator::mark_started`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartDisposition {
    /// A fresh run; the begin sequence must follow.
    Fresh,
    /// The animator was already running and was seamlessly re-targeted
    /// from its current value.
    Retarget,
    /// A start was already pending; only the delay clock restarted.
    AlreadyStarted,
}

/// Outcome of a successful `CameraAnimator::cancel`.
pub(crate) struct CancelledRun {
    /// Whether the run had begun (produced values) before the cancel.
    pub begun: bool,
    /// Last value the run produced, if any.
    pub value: Option<CameraValue>,
}

/// Progress of a running animator at some tick time.
pub(crate) struct Progress {
    /// Fraction of the current repeat cycle, before easing.
    pub fraction: f64,
    /// Index of the current repeat cycle.
    pub cycle: u64,
    /// Whether the whole run (all cycles) is complete.
    pub completed: bool,
}

/// A timed interpolation of a single camera property.
///
/// See the [module documentation](self) for the lifecycle. Instances are
/// created through the typed constructors and configured through the
/// returned [`CameraAnimatorBuilder`].
pub struct CameraAnimator {
    animator_type: CameraAnimatorType,
    trajectory: Trajectory,
    start_override: Option<CameraValue>,
    owner: Option<String>,
    duration: Duration,
    start_delay: Duration,
    easing: Easing,
    shortest_path: bool,
    repeat_count: u64,

    state: AnimatorState,
    started: bool,
    begun: bool,
    start_time: Option<SystemTime>,
    resolved_start: Option<CameraValue>,
    effective_legs: Option<Vec<CameraValue>>,
    current: Option<CameraValue>,
    completed_cycles: u64,

    status_listeners: Vec<Rc<dyn AnimatorStatusListener>>,
    update_listeners: Vec<Rc<dyn AnimatorUpdateListener>>,
}

impl fmt::Debug for CameraAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraAnimator")
            .field("animator_type", &self.animator_type)
            .field("state", &self.state)
            .field("owner", &self.owner)
            .field("duration", &self.duration)
            .field("start_delay", &self.start_delay)
            .finish_non_exhaustive()
    }
}

impl CameraAnimator {
    /// Creates an animator of the geographic center.
    pub fn center(
        targets: impl IntoIterator<Item = GeoPoint2d>,
    ) -> CameraAnimatorBuilder<GeoPoint2d> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Center, targets)
    }

    /// Creates an animator of the zoom level.
    pub fn zoom(targets: impl IntoIterator<Item = f64>) -> CameraAnimatorBuilder<f64> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Zoom, targets)
    }

    /// Creates an animator of the bearing.
    ///
    /// Bearing animators take the shortest angular path by default; disable
    /// it with [`CameraAnimatorBuilder::with_shortest_path`].
    pub fn bearing(targets: impl IntoIterator<Item = f64>) -> CameraAnimatorBuilder<f64> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Bearing, targets)
    }

    /// Creates an animator of the pitch.
    pub fn pitch(targets: impl IntoIterator<Item = f64>) -> CameraAnimatorBuilder<f64> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Pitch, targets)
    }

    /// Creates an animator of the viewport padding.
    pub fn padding(targets: impl IntoIterator<Item = Padding>) -> CameraAnimatorBuilder<Padding> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Padding, targets)
    }

    /// Creates an animator of the anchor point.
    pub fn anchor(
        targets: impl IntoIterator<Item = ScreenPoint>,
    ) -> CameraAnimatorBuilder<ScreenPoint> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Anchor, targets)
    }

    /// Creates an animator of an application-defined scalar property.
    ///
    /// Custom animators have no camera state to sample a start value from,
    /// so [`CameraAnimatorBuilder::with_start_value`] is required.
    pub fn custom(
        name: impl Into<String>,
        targets: impl IntoIterator<Item = f64>,
    ) -> CameraAnimatorBuilder<f64> {
        CameraAnimatorBuilder::new(CameraAnimatorType::Custom(name.into()), targets)
    }

    /// Creates an animator that evaluates a precomputed path.
    pub(crate) fn from_path(
        animator_type: CameraAnimatorType,
        path: Box<dyn Fn(f64) -> CameraValue>,
        duration: Duration,
        start_delay: Duration,
        easing: Easing,
        owner: Option<String>,
    ) -> CameraAnimator {
        let start = path(0.0);
        CameraAnimator {
            animator_type,
            trajectory: Trajectory::Path(path),
            start_override: Some(start),
            owner,
            duration,
            start_delay,
            easing,
            shortest_path: false,
            repeat_count: 0,
            state: AnimatorState::Pending,
            started: false,
            begun: false,
            start_time: None,
            resolved_start: None,
            effective_legs: None,
            current: None,
            completed_cycles: 0,
            status_listeners: Vec::new(),
            update_listeners: Vec::new(),
        }
    }

    /// Property this animator drives.
    pub fn animator_type(&self) -> &CameraAnimatorType {
        &self.animator_type
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AnimatorState {
        self.state
    }

    /// Owner tag used for selective cancellation.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Duration of one repeat cycle.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Delay between starting the animator and the begin of its run.
    pub fn start_delay(&self) -> Duration {
        self.start_delay
    }

    /// Last value this animator produced in its current run.
    pub fn current_value(&self) -> Option<CameraValue> {
        self.current
    }

    pub(crate) fn start_value_override(&self) -> Option<CameraValue> {
        self.start_override
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn is_begun(&self) -> bool {
        self.begun
    }

    pub(crate) fn add_status_listener(&mut self, listener: Rc<dyn AnimatorStatusListener>) {
        self.status_listeners.push(listener);
    }

    pub(crate) fn add_update_listener(&mut self, listener: Rc<dyn AnimatorUpdateListener>) {
        self.update_listeners.push(listener);
    }

    pub(crate) fn status_listeners(&self) -> &[Rc<dyn AnimatorStatusListener>] {
        &self.status_listeners
    }

    pub(crate) fn update_listeners(&self) -> &[Rc<dyn AnimatorUpdateListener>] {
        &self.update_listeners
    }

    pub(crate) fn mark_started(&mut self) -> StartDisposition {
        if self.state == AnimatorState::Running {
            self.resolved_start = self.current;
            if let Some(start) = self.resolved_start {
                self.effective_legs = self.compute_legs(&start);
            }
            self.start_time = None;
            self.completed_cycles = 0;
            StartDisposition::Retarget
        } else if self.started {
            self.start_time = None;
            StartDisposition::AlreadyStarted
        } else {
            self.state = AnimatorState::Pending;
            self.started = true;
            self.begun = false;
            self.start_time = None;
            self.resolved_start = None;
            self.effective_legs = None;
            self.current = None;
            self.completed_cycles = 0;
            StartDisposition::Fresh
        }
    }

    pub(crate) fn begin(&mut self, start: CameraValue) {
        self.resolved_start = Some(start);
        self.effective_legs = self.compute_legs(&start);
        self.current = Some(start);
        self.state = AnimatorState::Running;
        self.begun = true;
    }

    /// Records the tick time the start delay and duration are measured
    /// from. The first tick after `start` wins.
    pub(crate) fn note_tick(&mut self, now: SystemTime) {
        if self.started && self.start_time.is_none() {
            self.start_time = Some(now);
        }
    }

    pub(crate) fn begin_due(&self, now: SystemTime) -> bool {
        if !self.started || self.begun {
            return false;
        }
        match self.start_time {
            Some(start_time) => now >= start_time + self.start_delay,
            None => false,
        }
    }

    pub(crate) fn progress_at(&self, now: SystemTime) -> Option<Progress> {
        if !self.begun {
            return None;
        }
        let begin_deadline = self.start_time? + self.start_delay;
        let elapsed = now
            .duration_since(begin_deadline)
            .unwrap_or(Duration::ZERO);

        let total_cycles = self.repeat_count + 1;
        if self.duration.is_zero() {
            return Some(Progress {
                fraction: 1.0,
                cycle: total_cycles,
                completed: true,
            });
        }

        let ratio = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        if ratio >= total_cycles as f64 {
            Some(Progress {
                fraction: 1.0,
                cycle: total_cycles,
                completed: true,
            })
        } else {
            let cycle = ratio.floor();
            Some(Progress {
                fraction: ratio - cycle,
                cycle: cycle as u64,
                completed: false,
            })
        }
    }

    /// Value at the given raw fraction of one repeat cycle.
    pub(crate) fn value_at(&self, fraction: f64) -> Option<CameraValue> {
        let eased = self.easing.apply(fraction);
        match &self.trajectory {
            Trajectory::Path(path) => Some(path(eased)),
            Trajectory::Legs(_) => {
                let start = self.resolved_start?;
                let legs = self.effective_legs.as_ref()?;
                Some(eval_legs(start, legs, eased))
            }
        }
    }

    pub(crate) fn set_current(&mut self, value: CameraValue) {
        self.current = Some(value);
    }

    pub(crate) fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub(crate) fn set_completed_cycles(&mut self, cycles: u64) {
        self.completed_cycles = cycles;
    }

    pub(crate) fn finish(&mut self) {
        self.state = AnimatorState::Ended;
        self.started = false;
        self.begun = false;
    }

    pub(crate) fn cancel(&mut self) -> Option<CancelledRun> {
        if !self.started {
            return None;
        }
        let begun = self.begun;
        self.state = AnimatorState::Cancelled;
        self.started = false;
        self.begun = false;
        Some(CancelledRun {
            begun,
            value: self.current,
        })
    }

    fn compute_legs(&self, start: &CameraValue) -> Option<Vec<CameraValue>> {
        let Trajectory::Legs(targets) = &self.trajectory else {
            return None;
        };
        if !self.shortest_path {
            return Some(targets.clone());
        }

        let Some(mut previous) = start.as_scalar() else {
            return Some(targets.clone());
        };
        let mut legs = Vec::with_capacity(targets.len());
        for target in targets {
            let Some(target) = target.as_scalar() else {
                return Some(targets.clone());
            };
            let next = previous + shortest_rotation(previous, target);
            legs.push(CameraValue::Scalar(next));
            previous = next;
        }
        Some(legs)
    }
}

fn eval_legs(start: CameraValue, legs: &[CameraValue], t: f64) -> CameraValue {
    if legs.is_empty() {
        return start;
    }
    let segments = legs.len() as f64;
    let scaled = (t * segments).clamp(0.0, segments);
    let index = (scaled.floor() as usize).min(legs.len() - 1);
    let local = scaled - index as f64;
    let from = if index == 0 { start } else { legs[index - 1] };
    from.interpolate(&legs[index], local)
}

/// Configures and validates a [`CameraAnimator`].
///
/// Returned by the typed constructors on [`CameraAnimator`]. The value
/// type parameter ties the targets and the start value to the animated
/// property, so mismatched values are impossible to express.
pub struct CameraAnimatorBuilder<T> {
    animator_type: CameraAnimatorType,
    targets: Vec<T>,
    start: Option<T>,
    owner: Option<String>,
    duration: Duration,
    start_delay: Duration,
    easing: Easing,
    shortest_path: Option<bool>,
    repeat_count: u64,
    status_listeners: Vec<Rc<dyn AnimatorStatusListener>>,
    update_listeners: Vec<Rc<dyn AnimatorUpdateListener>>,
}

impl<T: Into<CameraValue> + Copy> CameraAnimatorBuilder<T> {
    fn new(animator_type: CameraAnimatorType, targets: impl IntoIterator<Item = T>) -> Self {
        Self {
            animator_type,
            targets: targets.into_iter().collect(),
            start: None,
            owner: None,
            duration: DEFAULT_ANIMATION_DURATION,
            start_delay: Duration::ZERO,
            easing: Easing::default(),
            shortest_path: None,
            repeat_count: 0,
            status_listeners: Vec::new(),
            update_listeners: Vec::new(),
        }
    }

    /// Sets an explicit start value.
    ///
    /// Without one, the start value is sampled from the camera at the
    /// moment the animator begins.
    pub fn with_start_value(mut self, start: T) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the owner tag used for selective cancellation and lifecycle
    /// attribution.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the duration of one run. A zero duration snaps to the target
    /// on the first tick.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the delay between starting the animator and the begin of its
    /// run.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Sets the easing curve.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Chooses whether angular targets are reached through the shortest
    /// rotation. Only valid for bearing animators, where it defaults to
    /// enabled.
    pub fn with_shortest_path(mut self, shortest_path: bool) -> Self {
        self.shortest_path = Some(shortest_path);
        self
    }

    /// Sets how many times the run is repeated after the first cycle.
    pub fn with_repeat_count(mut self, repeat_count: u64) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    /// Attaches a status listener.
    pub fn with_status_listener(mut self, listener: Rc<dyn AnimatorStatusListener>) -> Self {
        self.status_listeners.push(listener);
        self
    }

    /// Attaches an update listener.
    pub fn with_update_listener(mut self, listener: Rc<dyn AnimatorUpdateListener>) -> Self {
        self.update_listeners.push(listener);
        self
    }

    /// Validates the configuration and builds the animator.
    pub fn build(self) -> Result<CameraAnimator, TychoError> {
        if self.targets.is_empty() {
            return Err(TychoError::InvalidAnimator(format!(
                "{} animator needs at least one target",
                self.animator_type
            )));
        }

        let targets: Vec<CameraValue> = self.targets.iter().map(|t| (*t).into()).collect();
        if let Some(invalid) = targets.iter().find(|v| !v.is_valid()) {
            return Err(TychoError::InvalidAnimator(format!(
                "{} animator target is not a valid value: {invalid:?}",
                self.animator_type
            )));
        }

        let start = self.start.map(|s| s.into());
        if let Some(start) = &start {
            if !start.is_valid() {
                return Err(TychoError::InvalidAnimator(format!(
                    "{} animator start value is not a valid value: {start:?}",
                    self.animator_type
                )));
            }
        }

        if matches!(self.animator_type, CameraAnimatorType::Custom(_)) && start.is_none() {
            return Err(TychoError::InvalidAnimator(format!(
                "{} animator requires an explicit start value",
                self.animator_type
            )));
        }

        if self.shortest_path.is_some() && self.animator_type != CameraAnimatorType::Bearing {
            return Err(TychoError::InvalidAnimator(format!(
                "shortest path applies only to bearing animators, not {}",
                self.animator_type
            )));
        }

        let shortest_path = self
            .shortest_path
            .unwrap_or(self.animator_type == CameraAnimatorType::Bearing);

        Ok(CameraAnimator {
            animator_type: self.animator_type,
            trajectory: Trajectory::Legs(targets),
            start_override: start,
            owner: self.owner,
            duration: self.duration,
            start_delay: self.start_delay,
            easing: self.easing,
            shortest_path,
            repeat_count: self.repeat_count,
            state: AnimatorState::Pending,
            started: false,
            begun: false,
            start_time: None,
            resolved_start: None,
            effective_legs: None,
            current: None,
            completed_cycles: 0,
            status_listeners: self.status_listeners,
            update_listeners: self.update_listeners,
        })
    }
}
