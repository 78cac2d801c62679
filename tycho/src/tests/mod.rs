//! Behavior tests for the animation rig, driven through the public API
//! with recording camera and transform delegates.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use assert_matches::assert_matches;
use tycho_types::geo::GeoPoint;
use tycho_types::{latlon, CameraOptions, CameraState, Padding, ScreenPoint, Size};
use web_time::SystemTime;

use crate::delegate::{MapCamera, MapTransform};
use crate::error::TychoError;
use crate::listener::{
    AnimatorStatusListener, AnimatorUpdateListener, CameraAnimationsLifecycleObserver,
    CameraChangeListener,
};
use crate::{
    AnimationOptions, AnimatorId, AnimatorState, CameraAnimator, CameraAnimatorType, CameraRig,
    CameraValue, Easing,
};

#[derive(Default)]
struct CameraLog {
    state: CameraState,
    writes: Vec<CameraOptions>,
    fail_writes: bool,
}

/// Camera delegate that applies every write to a [`CameraState`] and keeps
/// the full write log. Clones share the log.
#[derive(Clone, Default)]
struct TestCamera(Rc<RefCell<CameraLog>>);

impl TestCamera {
    fn with_state(state: CameraState) -> Self {
        let camera = TestCamera::default();
        camera.0.borrow_mut().state = state;
        camera
    }

    fn snapshot(&self) -> CameraState {
        self.0.borrow().state
    }

    fn write_count(&self) -> usize {
        self.0.borrow().writes.len()
    }

    fn writes(&self) -> Vec<CameraOptions> {
        self.0.borrow().writes.clone()
    }

    fn fail_writes(&self) {
        self.0.borrow_mut().fail_writes = true;
    }
}

impl MapCamera for TestCamera {
    fn state(&self) -> CameraState {
        self.0.borrow().state
    }

    fn set_camera(&mut self, options: &CameraOptions) -> Result<(), TychoError> {
        let mut log = self.0.borrow_mut();
        if log.fail_writes {
            return Err(TychoError::CameraWrite("rejected by test camera".to_string()));
        }
        log.state = log.state.apply(options);
        log.writes.push(*options);
        Ok(())
    }
}

/// Transform delegate that records every user-animation flag transition.
#[derive(Clone, Default)]
struct TestTransform(Rc<RefCell<Vec<bool>>>);

impl TestTransform {
    fn flags(&self) -> Vec<bool> {
        self.0.borrow().clone()
    }
}

impl MapTransform for TestTransform {
    fn set_user_animation_in_progress(&mut self, in_progress: bool) {
        self.0.borrow_mut().push(in_progress);
    }

    fn size(&self) -> Size {
        Size::new(800.0, 600.0)
    }
}

#[derive(Default)]
struct CountingStatus {
    starts: RefCell<u32>,
    ends: RefCell<u32>,
    cancels: RefCell<u32>,
    repeats: RefCell<u32>,
}

impl AnimatorStatusListener for CountingStatus {
    fn on_animator_start(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        *self.starts.borrow_mut() += 1;
    }

    fn on_animator_end(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        *self.ends.borrow_mut() += 1;
    }

    fn on_animator_cancel(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        *self.cancels.borrow_mut() += 1;
    }

    fn on_animator_repeat(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        *self.repeats.borrow_mut() += 1;
    }
}

struct LabelledStatus {
    label: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl AnimatorStatusListener for LabelledStatus {
    fn on_animator_start(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        self.log.borrow_mut().push(format!("{} start", self.label));
    }

    fn on_animator_end(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        self.log.borrow_mut().push(format!("{} end", self.label));
    }

    fn on_animator_cancel(&self, _rig: &mut CameraRig, _animator: AnimatorId) {
        self.log.borrow_mut().push(format!("{} cancel", self.label));
    }
}

struct LifecycleRecorder(Rc<RefCell<Vec<String>>>);

impl CameraAnimationsLifecycleObserver for LifecycleRecorder {
    fn on_animator_starting(
        &self,
        _rig: &mut CameraRig,
        _animator: AnimatorId,
        animator_type: &CameraAnimatorType,
        _owner: Option<&str>,
    ) {
        self.0.borrow_mut().push(format!("starting {animator_type}"));
    }

    fn on_animator_interrupting(
        &self,
        _rig: &mut CameraRig,
        animator_type: &CameraAnimatorType,
        _running: AnimatorId,
        _running_owner: Option<&str>,
        _incoming: AnimatorId,
        _incoming_owner: Option<&str>,
    ) {
        self.0
            .borrow_mut()
            .push(format!("interrupting {animator_type}"));
    }

    fn on_animator_ending(
        &self,
        _rig: &mut CameraRig,
        _animator: AnimatorId,
        animator_type: &CameraAnimatorType,
        _owner: Option<&str>,
    ) {
        self.0.borrow_mut().push(format!("ending {animator_type}"));
    }

    fn on_animator_cancelling(
        &self,
        _rig: &mut CameraRig,
        _animator: AnimatorId,
        animator_type: &CameraAnimatorType,
        _owner: Option<&str>,
    ) {
        self.0
            .borrow_mut()
            .push(format!("cancelling {animator_type}"));
    }
}

/// Status listener that launches a flight when its animator ends.
struct ChainFlight {
    target: CameraOptions,
    options: AnimationOptions,
}

impl AnimatorStatusListener for ChainFlight {
    fn on_animator_end(&self, rig: &mut CameraRig, _animator: AnimatorId) {
        let _ = rig.fly_to(&self.target, &self.options);
    }
}

fn rig_with(state: CameraState) -> (CameraRig, TestCamera, TestTransform) {
    let camera = TestCamera::with_state(state);
    let transform = TestTransform::default();
    let rig = CameraRig::new(camera.clone(), transform.clone());
    (rig, camera, transform)
}

fn test_rig() -> (CameraRig, TestCamera, TestTransform) {
    rig_with(CameraState::default())
}

fn at(ms: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
}

fn linear_zoom(target: f64, millis: u64) -> CameraAnimator {
    CameraAnimator::zoom([target])
        .with_duration(Duration::from_millis(millis))
        .with_easing(Easing::Linear)
        .build()
        .unwrap()
}

fn linear_pitch(target: f64, millis: u64) -> CameraAnimator {
    CameraAnimator::pitch([target])
        .with_duration(Duration::from_millis(millis))
        .with_easing(Easing::Linear)
        .build()
        .unwrap()
}

#[test]
fn registered_animator_drives_the_camera() {
    let (mut rig, camera, _transform) = test_rig();
    let id = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear)
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();

    assert_eq!(rig.animator_state(id), Some(AnimatorState::Running));
    assert_eq!(camera.snapshot().zoom(), 0.0);

    rig.animate(at(0)).unwrap();
    rig.animate(at(5)).unwrap();
    assert_abs_diff_eq!(camera.snapshot().zoom(), 2.0, epsilon = 1e-9);

    rig.animate(at(10)).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 4.0, epsilon = 1e-9);
    assert!(!rig.has_running_animations());
}

#[test]
fn unregistered_animator_skips_camera_writes() {
    let (mut rig, camera, transform) = test_rig();
    let updates = Rc::new(RefCell::new(Vec::new()));
    let sink = updates.clone();
    let listener: Rc<dyn AnimatorUpdateListener> =
        Rc::new(move |_: &mut CameraRig, _: AnimatorId, value: &CameraValue| {
            if let Some(zoom) = value.as_scalar() {
                sink.borrow_mut().push(zoom);
            }
        });
    let id = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear)
            .with_update_listener(listener)
            .build()
            .unwrap(),
    );
    rig.start_animator(id).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Running));

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    assert_eq!(camera.write_count(), 0);
    assert!(transform.flags().is_empty());
    assert_eq!(updates.borrow().first().copied(), Some(0.0));
    assert_abs_diff_eq!(updates.borrow().last().copied().unwrap(), 4.0, epsilon = 1e-9);
    // The run is over and the animator was never registered, so the rig
    // forgets it.
    assert_eq!(rig.animator_state(id), None);
}

#[test]
fn unregistering_before_start_removes_all_camera_effect() {
    let (mut rig, camera, transform) = test_rig();
    let events = Rc::new(RefCell::new(Vec::new()));
    rig.add_lifecycle_observer(Rc::new(LifecycleRecorder(events.clone())));

    let id = rig.add_animator(linear_zoom(6.0, 10));
    rig.register_animators(&[id]);
    rig.unregister_animators(&[id]);

    rig.start_animator(id).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    assert_eq!(camera.write_count(), 0);
    assert!(transform.flags().is_empty());
    assert!(events.borrow().is_empty());
}

#[test]
fn same_property_start_interrupts_the_running_animator() {
    let (mut rig, camera, _transform) = test_rig();
    let first = rig.add_animator(linear_zoom(4.0, 100));
    let second = rig.add_animator(linear_zoom(8.0, 50));
    rig.register_animators(&[first, second]);

    rig.start_animator(first).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    rig.start_animator(second).unwrap();

    assert_eq!(rig.animator_state(first), Some(AnimatorState::Cancelled));
    assert_eq!(rig.animator_state(second), Some(AnimatorState::Running));

    rig.animate(at(20)).unwrap();
    rig.animate(at(70)).unwrap();
    assert_eq!(rig.animator_state(second), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 8.0, epsilon = 1e-9);
}

#[test]
fn different_properties_animate_concurrently() {
    let (mut rig, camera, _transform) = test_rig();
    let zoom = rig.add_animator(linear_zoom(6.0, 20));
    let pitch = rig.add_animator(linear_pitch(30.0, 20));
    rig.play_animators_together(&[zoom, pitch]).unwrap();

    assert_eq!(rig.running_count(), 2);
    rig.animate(at(0)).unwrap();
    rig.animate(at(20)).unwrap();

    assert_eq!(rig.animator_state(zoom), Some(AnimatorState::Ended));
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(camera.snapshot().pitch(), 30.0, epsilon = 1e-9);
}

#[test]
fn delayed_animator_interrupts_when_it_begins() {
    let (mut rig, _camera, _transform) = test_rig();
    let first = rig.add_animator(linear_zoom(4.0, 200));
    let second = rig.add_animator(
        CameraAnimator::zoom([8.0])
            .with_duration(Duration::from_millis(50))
            .with_start_delay(Duration::from_millis(50))
            .build()
            .unwrap(),
    );
    rig.register_animators(&[first, second]);

    rig.start_animator(first).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    rig.start_animator(second).unwrap();
    assert_eq!(rig.animator_state(first), Some(AnimatorState::Running));
    assert_eq!(rig.animator_state(second), Some(AnimatorState::Pending));

    // The delay counts from the first tick after start.
    rig.animate(at(20)).unwrap();
    rig.animate(at(69)).unwrap();
    assert_eq!(rig.animator_state(first), Some(AnimatorState::Running));

    rig.animate(at(70)).unwrap();
    assert_eq!(rig.animator_state(first), Some(AnimatorState::Cancelled));
    assert_eq!(rig.animator_state(second), Some(AnimatorState::Running));
}

#[test]
fn delayed_animators_started_together_let_the_last_one_win() {
    let (mut rig, camera, _transform) = test_rig();
    let third_status = Rc::new(CountingStatus::default());
    let first = rig.add_animator(linear_pitch(10.0, 1000));
    let second = rig.add_animator(
        CameraAnimator::pitch([20.0])
            .with_duration(Duration::from_millis(1000))
            .with_start_delay(Duration::from_millis(500))
            .with_easing(Easing::Linear)
            .build()
            .unwrap(),
    );
    let third = rig.add_animator(
        CameraAnimator::pitch([30.0])
            .with_duration(Duration::from_millis(1000))
            .with_start_delay(Duration::from_millis(750))
            .with_easing(Easing::Linear)
            .with_status_listener(third_status.clone())
            .build()
            .unwrap(),
    );
    rig.play_animators_together(&[first, second, third]).unwrap();

    // Only the zero-delay animator begins right away; the delayed ones
    // keep their turn until their own delay elapses.
    assert_eq!(rig.animator_state(first), Some(AnimatorState::Running));
    assert_eq!(rig.animator_state(second), Some(AnimatorState::Pending));
    assert_eq!(rig.animator_state(third), Some(AnimatorState::Pending));

    let mut ms = 0;
    while ms <= 2500 {
        rig.animate(at(ms)).unwrap();
        ms += 50;
    }

    // Each delayed animator interrupts the one driving when its delay
    // elapses, so the last one runs to completion.
    assert_eq!(rig.animator_state(first), Some(AnimatorState::Cancelled));
    assert_eq!(rig.animator_state(second), Some(AnimatorState::Cancelled));
    assert_eq!(rig.animator_state(third), Some(AnimatorState::Ended));
    assert_eq!(*third_status.ends.borrow(), 1);
    assert_eq!(*third_status.cancels.borrow(), 0);
    assert_abs_diff_eq!(camera.snapshot().pitch(), 30.0, epsilon = 1e-9);
}

#[test]
fn zero_duration_motion_completes_synchronously() {
    let (mut rig, camera, _transform) = test_rig();
    let handle = rig
        .ease_to(
            &CameraOptions::new().with_pitch(5.0),
            &AnimationOptions::new().with_duration(Duration::ZERO),
        )
        .unwrap();

    assert!(!rig.has_running_animations());
    assert_eq!(camera.snapshot().pitch(), 5.0);
    assert_eq!(rig.registered_count(), 0);
    assert_eq!(rig.animator_state(handle.animator_ids()[0]), None);
}

#[test]
fn back_to_back_zero_duration_eases_commit_every_value() {
    let (mut rig, _camera, _transform) = test_rig();
    let committed = Rc::new(RefCell::new(Vec::new()));
    let sink = committed.clone();
    let listener: Rc<dyn CameraChangeListener<f64>> =
        Rc::new(move |_: &mut CameraRig, pitch: &f64| {
            sink.borrow_mut().push(*pitch);
        });
    rig.add_pitch_change_listener(listener);

    let options = AnimationOptions::new().with_duration(Duration::ZERO);
    for target in [5.0, 10.0, 15.0] {
        rig.ease_to(&CameraOptions::new().with_pitch(target), &options)
            .unwrap();
    }

    assert_eq!(*committed.borrow(), vec![0.0, 5.0, 10.0, 15.0]);
}

#[test]
fn user_animation_flag_spans_overlapping_runs() {
    let (mut rig, _camera, transform) = test_rig();
    let zoom = rig.add_animator(linear_zoom(6.0, 20));
    let pitch = rig.add_animator(linear_pitch(30.0, 30));
    rig.play_animators_together(&[zoom, pitch]).unwrap();

    rig.animate(at(0)).unwrap();
    rig.animate(at(20)).unwrap();
    rig.animate(at(30)).unwrap();

    assert_eq!(rig.running_count(), 0);
    assert_eq!(transform.flags(), vec![true, true, false]);
}

#[test]
fn user_animation_flag_cycles_between_runs() {
    let (mut rig, _camera, transform) = test_rig();
    let options = AnimationOptions::new().with_duration(Duration::ZERO);
    rig.ease_to(&CameraOptions::new().with_pitch(5.0), &options)
        .unwrap();
    rig.ease_to(&CameraOptions::new().with_pitch(10.0), &options)
        .unwrap();

    assert_eq!(transform.flags(), vec![true, false, true, false]);
}

#[test]
fn same_property_handoff_keeps_the_flag_up() {
    let (mut rig, _camera, transform) = test_rig();
    let first = rig.add_animator(linear_zoom(4.0, 100));
    let second = rig.add_animator(linear_zoom(8.0, 20));
    rig.register_animators(&[first, second]);

    rig.start_animator(first).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    rig.start_animator(second).unwrap();

    rig.animate(at(20)).unwrap();
    rig.animate(at(40)).unwrap();
    assert_eq!(rig.running_count(), 0);
    // The incoming animator is counted before the running one is
    // cancelled, so the flag never drops during the handoff.
    assert_eq!(transform.flags(), vec![true, true, false]);
}

#[test]
fn sequence_advances_when_a_run_ends() {
    let (mut rig, camera, _transform) = test_rig();
    let zoom = rig.add_animator(linear_zoom(6.0, 10));
    let pitch = rig.add_animator(linear_pitch(30.0, 10));
    rig.play_animators_sequentially(&[zoom, pitch]).unwrap();

    assert_eq!(rig.animator_state(zoom), Some(AnimatorState::Running));
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Pending));

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    assert_eq!(rig.animator_state(zoom), Some(AnimatorState::Ended));
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Running));

    rig.animate(at(15)).unwrap();
    rig.animate(at(25)).unwrap();
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(camera.snapshot().pitch(), 30.0, epsilon = 1e-9);
}

#[test]
fn sequence_advances_when_a_run_is_cancelled() {
    let (mut rig, camera, _transform) = test_rig();
    let zoom = rig.add_animator(linear_zoom(6.0, 100));
    let pitch = rig.add_animator(linear_pitch(30.0, 10));
    rig.play_animators_sequentially(&[zoom, pitch]).unwrap();

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    rig.cancel_animator(zoom).unwrap();

    assert_eq!(rig.animator_state(zoom), Some(AnimatorState::Cancelled));
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Running));

    rig.animate(at(20)).unwrap();
    rig.animate(at(30)).unwrap();
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().pitch(), 30.0, epsilon = 1e-9);
}

#[test]
fn cancel_animators_except_spares_kept_owners() {
    let (mut rig, _camera, _transform) = test_rig();
    let gesture = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_duration(Duration::from_millis(100))
            .with_owner("gestures")
            .build()
            .unwrap(),
    );
    let api = rig.add_animator(
        CameraAnimator::pitch([30.0])
            .with_duration(Duration::from_millis(100))
            .with_owner("api")
            .build()
            .unwrap(),
    );
    let anonymous = rig.add_animator(
        CameraAnimator::bearing([90.0])
            .with_duration(Duration::from_millis(100))
            .build()
            .unwrap(),
    );
    rig.play_animators_together(&[gesture, api, anonymous])
        .unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    rig.cancel_animators_except(&["gestures"]).unwrap();

    assert_eq!(rig.animator_state(gesture), Some(AnimatorState::Running));
    assert_eq!(rig.animator_state(api), Some(AnimatorState::Cancelled));
    // Animators without an owner tag are not spared.
    assert_eq!(rig.animator_state(anonymous), Some(AnimatorState::Cancelled));
}

#[test]
fn cancel_all_animators_stops_every_run() {
    let (mut rig, _camera, transform) = test_rig();
    let zoom = rig.add_animator(linear_zoom(6.0, 100));
    let pitch = rig.add_animator(linear_pitch(30.0, 100));
    rig.play_animators_together(&[zoom, pitch]).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    rig.cancel_all_animators().unwrap();

    assert_eq!(rig.animator_state(zoom), Some(AnimatorState::Cancelled));
    assert_eq!(rig.animator_state(pitch), Some(AnimatorState::Cancelled));
    assert_eq!(rig.running_count(), 0);
    assert_eq!(transform.flags().last(), Some(&false));
}

#[test]
fn cancelling_a_motion_before_the_first_tick_reports_start_and_cancel() {
    let (mut rig, camera, _transform) = test_rig();
    let counting = Rc::new(CountingStatus::default());
    let options = AnimationOptions::new()
        .with_duration(Duration::from_millis(100))
        .with_animator_listener(counting.clone());
    let handle = rig
        .ease_to(&CameraOptions::new().with_zoom(3.0), &options)
        .unwrap();

    rig.cancel_animation(&handle).unwrap();

    assert_eq!(*counting.starts.borrow(), 1);
    assert_eq!(*counting.cancels.borrow(), 1);
    assert_eq!(*counting.ends.borrow(), 1);
    assert!(!rig.has_running_animations());
    // Only the start value was ever produced.
    assert_eq!(camera.snapshot().zoom(), 0.0);
}

#[test]
fn high_level_listener_reports_the_set_once() {
    let (mut rig, _camera, _transform) = test_rig();
    let counting = Rc::new(CountingStatus::default());
    let options = AnimationOptions::new()
        .with_duration(Duration::from_millis(10))
        .with_animator_listener(counting.clone());
    rig.ease_to(
        &CameraOptions::new()
            .with_center(latlon!(10.0, 20.0))
            .with_zoom(5.0),
        &options,
    )
    .unwrap();

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    assert_eq!(*counting.starts.borrow(), 1);
    assert_eq!(*counting.ends.borrow(), 1);
    assert_eq!(*counting.cancels.borrow(), 0);
}

#[test]
fn motion_listener_is_released_after_the_run() {
    let (mut rig, _camera, _transform) = test_rig();
    let listener: Rc<dyn AnimatorStatusListener> = Rc::new(CountingStatus::default());
    let options = AnimationOptions::new()
        .with_duration(Duration::from_millis(10))
        .with_animator_listener(listener.clone());
    rig.ease_to(&CameraOptions::new().with_zoom(3.0), &options)
        .unwrap();

    assert!(Rc::strong_count(&listener) > 2);

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    drop(options);

    assert_eq!(Rc::strong_count(&listener), 1);
}

#[test]
fn zero_duration_motion_does_not_retain_the_listener() {
    let (mut rig, camera, _transform) = test_rig();
    let listener: Rc<dyn AnimatorStatusListener> = Rc::new(CountingStatus::default());
    let options = AnimationOptions::new()
        .with_duration(Duration::ZERO)
        .with_animator_listener(listener.clone());
    rig.ease_to(&CameraOptions::new().with_pitch(5.0), &options)
        .unwrap();
    drop(options);

    assert_eq!(Rc::strong_count(&listener), 1);
    assert_eq!(camera.snapshot().pitch(), 5.0);
}

#[test]
fn motion_started_from_an_end_callback_runs() {
    let (mut rig, camera, _transform) = test_rig();
    let chain: Rc<dyn AnimatorStatusListener> = Rc::new(ChainFlight {
        target: CameraOptions::new()
            .with_center(latlon!(48.8566, 2.3522))
            .with_zoom(11.0),
        options: AnimationOptions::new().with_duration(Duration::from_millis(20)),
    });
    let options = AnimationOptions::new()
        .with_duration(Duration::from_millis(10))
        .with_animator_listener(chain);
    rig.ease_to(&CameraOptions::new().with_zoom(12.0), &options)
        .unwrap();

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    // The ease is over and the flight it chained is already running.
    assert!(rig.has_running_animations());

    rig.animate(at(15)).unwrap();
    rig.animate(at(25)).unwrap();
    rig.animate(at(35)).unwrap();

    assert!(!rig.has_running_animations());
    assert_abs_diff_eq!(camera.snapshot().zoom(), 11.0, epsilon = 1e-9);
    assert_abs_diff_eq!(camera.snapshot().center().lat(), 48.8566, epsilon = 1e-9);
    assert_abs_diff_eq!(camera.snapshot().center().lon(), 2.3522, epsilon = 1e-9);
}

#[test]
fn interruption_events_arrive_in_transition_order() {
    let (mut rig, _camera, _transform) = test_rig();
    let events = Rc::new(RefCell::new(Vec::new()));
    rig.add_lifecycle_observer(Rc::new(LifecycleRecorder(events.clone())));
    let first = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_duration(Duration::from_millis(100))
            .with_status_listener(Rc::new(LabelledStatus {
                label: "first",
                log: events.clone(),
            }))
            .build()
            .unwrap(),
    );
    let second = rig.add_animator(
        CameraAnimator::zoom([8.0])
            .with_duration(Duration::from_millis(100))
            .with_status_listener(Rc::new(LabelledStatus {
                label: "second",
                log: events.clone(),
            }))
            .build()
            .unwrap(),
    );
    rig.register_animators(&[first, second]);

    rig.start_animator(first).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    rig.start_animator(second).unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "starting zoom",
            "first start",
            "starting zoom",
            "interrupting zoom",
            "cancelling zoom",
            "first cancel",
            "first end",
            "second start",
        ]
    );
}

#[test]
fn double_cancel_is_a_no_op() {
    let (mut rig, _camera, _transform) = test_rig();
    let counting = Rc::new(CountingStatus::default());
    let id = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_duration(Duration::from_millis(100))
            .with_status_listener(counting.clone())
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();

    rig.cancel_animator(id).unwrap();
    rig.cancel_animator(id).unwrap();

    assert_eq!(rig.animator_state(id), Some(AnimatorState::Cancelled));
    assert_eq!(*counting.cancels.borrow(), 1);
    assert_eq!(*counting.ends.borrow(), 1);
}

#[test]
fn camera_write_failure_surfaces_from_start() {
    let (mut rig, camera, _transform) = test_rig();
    camera.fail_writes();

    let result = rig.ease_to(&CameraOptions::new().with_zoom(3.0), &AnimationOptions::new());

    assert_matches!(result, Err(TychoError::CameraWrite(_)));
}

#[test]
fn ended_animator_can_run_again() {
    let (mut rig, camera, _transform) = test_rig();
    let counting = Rc::new(CountingStatus::default());
    let id = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear)
            .with_status_listener(counting.clone())
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));

    rig.start_animator(id).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Running));
    // The explicit start value applies to every run.
    assert_eq!(camera.snapshot().zoom(), 0.0);

    rig.animate(at(20)).unwrap();
    rig.animate(at(30)).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 4.0, epsilon = 1e-9);
    assert_eq!(*counting.starts.borrow(), 2);
    assert_eq!(*counting.ends.borrow(), 2);
}

#[test]
fn starting_a_running_animator_retargets_silently() {
    let (mut rig, camera, _transform) = test_rig();
    let counting = Rc::new(CountingStatus::default());
    let id = rig.add_animator(
        CameraAnimator::zoom([10.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(100))
            .with_easing(Easing::Linear)
            .with_status_listener(counting.clone())
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(40)).unwrap();
    assert_abs_diff_eq!(camera.snapshot().zoom(), 4.0, epsilon = 1e-6);

    rig.start_animator(id).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Running));
    assert_eq!(*counting.starts.borrow(), 1);

    // The run restarts its clock from the current value.
    rig.animate(at(50)).unwrap();
    rig.animate(at(100)).unwrap();
    assert_abs_diff_eq!(camera.snapshot().zoom(), 7.0, epsilon = 1e-6);

    rig.animate(at(150)).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 10.0, epsilon = 1e-9);
    assert_eq!(*counting.starts.borrow(), 1);
    assert_eq!(*counting.ends.borrow(), 1);
}

#[test]
fn bearing_commits_normalized_values_across_the_wrap() {
    let (mut rig, camera, _transform) = rig_with(CameraState::new(
        latlon!(0.0, 0.0),
        Padding::default(),
        5.0,
        350.0,
        0.0,
    ));
    let committed = Rc::new(RefCell::new(Vec::new()));
    let sink = committed.clone();
    let listener: Rc<dyn CameraChangeListener<f64>> =
        Rc::new(move |_: &mut CameraRig, bearing: &f64| {
            sink.borrow_mut().push(*bearing);
        });
    rig.add_bearing_change_listener(listener);

    rig.ease_to(
        &CameraOptions::new().with_bearing(10.0),
        &AnimationOptions::new()
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear),
    )
    .unwrap();
    for ms in 0..=10 {
        rig.animate(at(ms)).unwrap();
    }

    assert_abs_diff_eq!(camera.snapshot().bearing(), 10.0, epsilon = 1e-9);
    let values = committed.borrow().clone();
    assert_eq!(values.first().copied(), Some(350.0));
    assert_abs_diff_eq!(values.last().copied().unwrap(), 10.0, epsilon = 1e-9);
    // The rotation takes the short way over north and every committed
    // value is wrapped to [0, 360).
    for value in &values {
        assert!((0.0..360.0).contains(value));
        assert!(*value >= 349.99 || *value <= 10.01);
    }
}

#[test]
fn bearing_eases_directly_for_small_changes() {
    let (mut rig, camera, _transform) = rig_with(CameraState::new(
        latlon!(0.0, 0.0),
        Padding::default(),
        5.0,
        10.0,
        0.0,
    ));
    let committed = Rc::new(RefCell::new(Vec::new()));
    let sink = committed.clone();
    let listener: Rc<dyn CameraChangeListener<f64>> =
        Rc::new(move |_: &mut CameraRig, bearing: &f64| {
            sink.borrow_mut().push(*bearing);
        });
    rig.add_bearing_change_listener(listener);

    rig.ease_to(
        &CameraOptions::new().with_bearing(12.0),
        &AnimationOptions::new()
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear),
    )
    .unwrap();
    for ms in 0..=10 {
        rig.animate(at(ms)).unwrap();
    }

    assert_abs_diff_eq!(camera.snapshot().bearing(), 12.0, epsilon = 1e-9);
    for value in &*committed.borrow() {
        assert!(*value >= 9.99 && *value <= 12.01);
    }
}

#[test]
fn unregistering_mid_run_detaches_the_camera() {
    let (mut rig, camera, transform) = test_rig();
    let id = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(100))
            .with_easing(Easing::Linear)
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();
    rig.animate(at(0)).unwrap();
    rig.animate(at(20)).unwrap();
    let writes_before = camera.write_count();

    rig.unregister_animators(&[id]);
    assert_eq!(transform.flags(), vec![true, false]);

    rig.animate(at(40)).unwrap();
    rig.animate(at(60)).unwrap();
    assert_eq!(camera.write_count(), writes_before);
    // The run itself keeps going without the camera.
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Running));

    rig.animate(at(100)).unwrap();
    assert_eq!(camera.write_count(), writes_before);
    assert_eq!(rig.animator_state(id), None);
}

#[test]
fn update_and_write_counts_are_stable() {
    let (mut rig, camera, _transform) = test_rig();
    let updates = Rc::new(RefCell::new(Vec::new()));
    let sink = updates.clone();
    let listener: Rc<dyn AnimatorUpdateListener> =
        Rc::new(move |_: &mut CameraRig, _: AnimatorId, value: &CameraValue| {
            if let Some(zoom) = value.as_scalar() {
                sink.borrow_mut().push(zoom);
            }
        });
    let id = rig.add_animator(
        CameraAnimator::zoom([10.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear)
            .with_update_listener(listener)
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();
    for ms in 1..=11 {
        rig.animate(at(ms)).unwrap();
    }

    // Start value, nine interpolated frames, final value.
    assert_eq!(updates.borrow().len(), 11);
    // Every update is written, plus one terminal write of the end value.
    assert_eq!(camera.write_count(), 12);
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));
}

#[test]
fn anchor_updates_notify_once_per_change() {
    let (mut rig, _camera, _transform) = test_rig();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    let listener: Rc<dyn CameraChangeListener<Option<ScreenPoint>>> =
        Rc::new(move |_: &mut CameraRig, anchor: &Option<ScreenPoint>| {
            sink.borrow_mut().push(*anchor);
        });
    rig.add_anchor_change_listener(listener);

    rig.set_anchor(Some(ScreenPoint::new(10.0, 20.0)));
    rig.set_anchor(Some(ScreenPoint::new(10.0, 20.0)));
    rig.set_anchor(Some(ScreenPoint::new(30.0, 40.0)));
    rig.set_anchor(None);
    rig.set_anchor(None);

    assert_eq!(
        *changes.borrow(),
        vec![
            Some(ScreenPoint::new(10.0, 20.0)),
            Some(ScreenPoint::new(30.0, 40.0)),
            None,
        ]
    );
}

#[test]
fn camera_writes_carry_the_anchor() {
    let (mut rig, camera, _transform) = test_rig();
    let pivot = ScreenPoint::new(100.0, 50.0);
    rig.set_anchor(Some(pivot));

    rig.ease_to(
        &CameraOptions::new().with_zoom(3.0),
        &AnimationOptions::new().with_duration(Duration::from_millis(10)),
    )
    .unwrap();
    for ms in 0..=10 {
        rig.animate(at(ms)).unwrap();
    }

    let writes = camera.writes();
    assert!(!writes.is_empty());
    assert!(writes.iter().all(|options| options.anchor() == Some(pivot)));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 3.0, epsilon = 1e-9);
}

#[test]
fn scale_about_anchor_moves_the_rig_anchor() {
    let (mut rig, camera, _transform) = rig_with(CameraState::new(
        latlon!(0.0, 0.0),
        Padding::default(),
        10.0,
        0.0,
        0.0,
    ));
    let pivot = ScreenPoint::new(100.0, 50.0);
    rig.scale_by(
        4.0,
        Some(pivot),
        &AnimationOptions::new().with_duration(Duration::from_millis(10)),
    )
    .unwrap();

    assert_eq!(rig.anchor(), Some(pivot));

    for ms in 0..=10 {
        rig.animate(at(ms)).unwrap();
    }

    assert_abs_diff_eq!(camera.snapshot().zoom(), 12.0, epsilon = 1e-9);
    assert_eq!(rig.anchor(), Some(pivot));
    let last_zoom_write = camera
        .writes()
        .into_iter()
        .rev()
        .find(|options| options.zoom().is_some())
        .unwrap();
    assert_eq!(last_zoom_write.anchor(), Some(pivot));
}

#[test]
fn anchor_animator_needs_a_start_value_or_rig_anchor() {
    let (mut rig, _camera, _transform) = test_rig();
    let id = rig.add_animator(
        CameraAnimator::anchor([ScreenPoint::new(5.0, 5.0)])
            .with_duration(Duration::from_millis(10))
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);

    let result = rig.start_animator(id);
    assert_matches!(result, Err(TychoError::InvalidAnimator(_)));
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Cancelled));

    // With a rig anchor in place the same animator can run.
    rig.set_anchor(Some(ScreenPoint::new(0.0, 0.0)));
    rig.start_animator(id).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Running));

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));
    assert_eq!(rig.anchor(), Some(ScreenPoint::new(5.0, 5.0)));
}

#[test]
fn custom_animator_reaches_listeners_without_camera_writes() {
    let (mut rig, camera, transform) = test_rig();
    let updates = Rc::new(RefCell::new(Vec::new()));
    let sink = updates.clone();
    let listener: Rc<dyn AnimatorUpdateListener> =
        Rc::new(move |_: &mut CameraRig, _: AnimatorId, value: &CameraValue| {
            if let Some(progress) = value.as_scalar() {
                sink.borrow_mut().push(progress);
            }
        });
    let id = rig.add_animator(
        CameraAnimator::custom("puck-bearing", [1.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear)
            .with_update_listener(listener)
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();
    for ms in 0..=10 {
        rig.animate(at(ms)).unwrap();
    }

    assert_eq!(camera.write_count(), 0);
    assert_eq!(updates.borrow().first().copied(), Some(0.0));
    assert_abs_diff_eq!(updates.borrow().last().copied().unwrap(), 1.0, epsilon = 1e-9);
    // Custom animators still count toward the user-animation flag.
    assert_eq!(transform.flags(), vec![true, false]);
}

#[test]
fn ease_to_moves_every_requested_property() {
    let (mut rig, camera, _transform) = test_rig();
    let target = CameraOptions::new()
        .with_center(latlon!(10.0, 20.0))
        .with_zoom(5.0)
        .with_bearing(90.0)
        .with_pitch(30.0)
        .with_padding(Padding::new(1.0, 2.0, 3.0, 4.0));
    rig.ease_to(
        &target,
        &AnimationOptions::new().with_duration(Duration::from_millis(10)),
    )
    .unwrap();

    assert_eq!(rig.registered_count(), 5);
    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    let state = camera.snapshot();
    assert_abs_diff_eq!(state.center().lat(), 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(state.center().lon(), 20.0, epsilon = 1e-9);
    assert_abs_diff_eq!(state.zoom(), 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(state.bearing(), 90.0, epsilon = 1e-9);
    assert_abs_diff_eq!(state.pitch(), 30.0, epsilon = 1e-9);
    assert_eq!(state.padding(), Padding::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(rig.registered_count(), 0);
}

#[test]
fn fly_to_arrives_exactly_at_the_target() {
    let (mut rig, camera, _transform) = rig_with(CameraState::new(
        latlon!(52.52, 13.405),
        Padding::default(),
        10.0,
        0.0,
        0.0,
    ));
    rig.fly_to(
        &CameraOptions::new()
            .with_center(latlon!(-33.8688, 151.2093))
            .with_zoom(11.0)
            .with_bearing(25.0),
        &AnimationOptions::new().with_duration(Duration::from_millis(100)),
    )
    .unwrap();

    let mut ms = 0;
    while rig.has_running_animations() {
        rig.animate(at(ms)).unwrap();
        ms += 5;
        assert!(ms <= 200);
    }

    let state = camera.snapshot();
    assert_abs_diff_eq!(state.center().lat(), -33.8688, epsilon = 1e-9);
    assert_abs_diff_eq!(state.center().lon(), 151.2093, epsilon = 1e-9);
    assert_abs_diff_eq!(state.zoom(), 11.0, epsilon = 1e-9);
    assert_abs_diff_eq!(state.bearing(), 25.0, epsilon = 1e-9);
}

#[test]
fn motion_animators_are_pruned_after_completion() {
    let (mut rig, _camera, _transform) = test_rig();
    let handle = rig
        .ease_to(
            &CameraOptions::new()
                .with_center(latlon!(10.0, 20.0))
                .with_zoom(5.0),
            &AnimationOptions::new().with_duration(Duration::from_millis(10)),
        )
        .unwrap();

    assert_eq!(handle.animator_ids().len(), 2);
    assert_eq!(rig.registered_count(), 2);

    rig.animate(at(0)).unwrap();
    rig.animate(at(10)).unwrap();

    assert_eq!(rig.registered_count(), 0);
    assert!(handle
        .animator_ids()
        .iter()
        .all(|id| rig.animator_state(*id).is_none()));
    // Cancelling a finished motion is a no-op.
    rig.cancel_animation(&handle).unwrap();
}

#[test]
fn repeating_animator_reports_each_cycle() {
    let (mut rig, camera, _transform) = test_rig();
    let counting = Rc::new(CountingStatus::default());
    let id = rig.add_animator(
        CameraAnimator::zoom([4.0])
            .with_start_value(0.0)
            .with_duration(Duration::from_millis(10))
            .with_easing(Easing::Linear)
            .with_repeat_count(2)
            .with_status_listener(counting.clone())
            .build()
            .unwrap(),
    );
    rig.register_animators(&[id]);
    rig.start_animator(id).unwrap();
    for ms in [0, 5, 12, 15, 22, 25, 31] {
        rig.animate(at(ms)).unwrap();
    }

    assert_eq!(*counting.starts.borrow(), 1);
    assert_eq!(*counting.repeats.borrow(), 2);
    assert_eq!(*counting.ends.borrow(), 1);
    assert_eq!(rig.animator_state(id), Some(AnimatorState::Ended));
    assert_abs_diff_eq!(camera.snapshot().zoom(), 4.0, epsilon = 1e-9);
}
