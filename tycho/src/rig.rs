//! The camera animation rig.
//!
//! [`CameraRig`] owns every camera animator, runs their shared clock, and
//! funnels their values into the host's camera. One rig drives one map
//! view. The host supplies the camera and transform delegates, registers
//! animators (or uses the built-in motions), and calls
//! [`CameraRig::animate`] once per frame.
//!
//! All listener callbacks receive `&mut CameraRig`, so any rig operation
//! can be called from inside any callback. Notifications raised while a
//! callback runs are queued and delivered after it returns, in the order
//! the transitions happened.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use web_time::SystemTime;

use tycho_types::{CameraOptions, GeoPoint2d, Padding, ScreenPoint, ScreenVector};

use crate::animator::{
    AnimatorState, CameraAnimator, CameraAnimatorType, CameraValue, StartDisposition,
};
use crate::delegate::{MapCamera, MapTransform};
use crate::error::TychoError;
use crate::listener::{
    AnimatorStatusListener, CameraAnimationsLifecycleObserver, CameraChangeListener,
};
use crate::messenger::Messenger;
use crate::motion::{self, AnimationOptions};
use crate::transform::normalize_bearing;

/// Identifier of an animator owned by a [`CameraRig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(u64);

/// Handle to the animator set of one started motion.
///
/// Returned by the high-level motion methods of [`CameraRig`]. The handle
/// stays valid after the motion completes; cancelling it then has no
/// effect.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    ids: Vec<AnimatorId>,
}

impl AnimationHandle {
    /// Ids of the animators the motion started.
    pub fn animator_ids(&self) -> &[AnimatorId] {
        &self.ids
    }
}

struct AnimatorSlot {
    animator: CameraAnimator,
    registered: bool,
    /// Whether this animator currently holds a count in the
    /// user-animation refcount.
    counted: bool,
    /// Transient slots are unregistered when their run reaches a terminal
    /// state, which lets the rig prune them. Used for motion sets.
    transient: bool,
    /// Animator to start when this one reaches a terminal state.
    sequence_next: Option<AnimatorId>,
}

/// A queued listener invocation.
///
/// Camera writes and state changes happen eagerly at transition time;
/// only the listener calls are deferred through this queue.
enum Notification {
    LifecycleStarting {
        id: AnimatorId,
    },
    LifecycleInterrupting {
        running: AnimatorId,
        incoming: AnimatorId,
    },
    LifecycleEnding {
        id: AnimatorId,
    },
    LifecycleCancelling {
        id: AnimatorId,
    },
    StatusStart {
        id: AnimatorId,
    },
    StatusEnd {
        id: AnimatorId,
    },
    StatusCancel {
        id: AnimatorId,
    },
    StatusRepeat {
        id: AnimatorId,
    },
    Update {
        id: AnimatorId,
        value: CameraValue,
    },
    CameraChange {
        animator_type: CameraAnimatorType,
        value: CameraValue,
    },
    AnchorChange {
        anchor: Option<ScreenPoint>,
    },
}

#[derive(Default)]
struct ChangeListeners {
    center: Vec<Rc<dyn CameraChangeListener<GeoPoint2d>>>,
    zoom: Vec<Rc<dyn CameraChangeListener<f64>>>,
    bearing: Vec<Rc<dyn CameraChangeListener<f64>>>,
    pitch: Vec<Rc<dyn CameraChangeListener<f64>>>,
    padding: Vec<Rc<dyn CameraChangeListener<Padding>>>,
    anchor: Vec<Rc<dyn CameraChangeListener<Option<ScreenPoint>>>>,
}

/// Coordinates every camera animator of one map view.
///
/// The rig keeps animators of the same property from fighting over the
/// camera: when an animator begins while a registered animator of the
/// same property runs, the running one is cancelled first. It also
/// maintains the user-animation flag on the transform delegate, fans out
/// lifecycle and value notifications, and merges produced values into
/// camera writes, using the current anchor point as the write pivot.
pub struct CameraRig {
    camera: Box<dyn MapCamera>,
    transform: Box<dyn MapTransform>,
    messenger: Option<Box<dyn Messenger>>,

    animators: HashMap<AnimatorId, AnimatorSlot>,
    start_order: Vec<AnimatorId>,
    next_id: u64,

    anchor: Option<ScreenPoint>,
    committed: HashMap<CameraAnimatorType, CameraValue>,
    counted_running: usize,

    lifecycle_observers: Vec<Rc<dyn CameraAnimationsLifecycleObserver>>,
    change_listeners: ChangeListeners,
    motion_listeners: HashMap<AnimatorId, Rc<dyn AnimatorStatusListener>>,

    queue: VecDeque<Notification>,
    dispatching: bool,
}

impl CameraRig {
    /// Creates a rig driving the given camera and transform delegates.
    pub fn new(camera: impl MapCamera + 'static, transform: impl MapTransform + 'static) -> Self {
        Self {
            camera: Box::new(camera),
            transform: Box::new(transform),
            messenger: None,
            animators: HashMap::new(),
            start_order: Vec::new(),
            next_id: 0,
            anchor: None,
            committed: HashMap::new(),
            counted_running: 0,
            lifecycle_observers: Vec::new(),
            change_listeners: ChangeListeners::default(),
            motion_listeners: HashMap::new(),
            queue: VecDeque::new(),
            dispatching: false,
        }
    }

    /// Sets the messenger used to request redraws while animations run.
    pub fn set_messenger(&mut self, messenger: impl Messenger + 'static) {
        self.messenger = Some(Box::new(messenger));
    }

    /// Hands an animator over to the rig and returns its id.
    ///
    /// The animator is stored but not registered; register it to give it
    /// camera effect, then start it.
    pub fn add_animator(&mut self, animator: CameraAnimator) -> AnimatorId {
        self.insert(animator)
    }

    /// Gives the animators camera effect, lifecycle events, and
    /// user-animation flag participation.
    ///
    /// Unknown ids are logged and skipped; registering an already
    /// registered animator has no effect.
    pub fn register_animators(&mut self, ids: &[AnimatorId]) {
        for id in ids {
            match self.animators.get_mut(id) {
                Some(slot) => slot.registered = true,
                None => log::warn!("Attempt to register unknown animator {id:?}"),
            }
        }
    }

    /// Removes the animators from the registry.
    ///
    /// A running animator keeps running, but stops writing the camera,
    /// emitting lifecycle events, and holding the user-animation flag.
    pub fn unregister_animators(&mut self, ids: &[AnimatorId]) {
        self.unregister_ids(ids);
        self.drain();
    }

    /// Removes every animator from the registry.
    pub fn unregister_all_animators(&mut self) {
        let ids: Vec<AnimatorId> = self
            .animators
            .iter()
            .filter(|(_, slot)| slot.registered)
            .map(|(id, _)| *id)
            .collect();
        self.unregister_ids(&ids);
        self.drain();
    }

    /// Starts the animator.
    ///
    /// With no start delay the run begins inside this call; otherwise it
    /// begins on the first tick at or after the delay elapses. Starting a
    /// running animator re-targets it from its current value without
    /// emitting new lifecycle events; starting a finished one runs it
    /// again.
    pub fn start_animator(&mut self, id: AnimatorId) -> Result<(), TychoError> {
        let result = self.start_internal(id);
        self.drain();
        result
    }

    /// Cancels the animator's current run.
    ///
    /// Cancelling an animator that was never started, or whose run is
    /// already over, has no effect.
    pub fn cancel_animator(&mut self, id: AnimatorId) -> Result<(), TychoError> {
        let result = self.cancel_internal(id);
        self.drain();
        result
    }

    /// Registers and starts every animator in order.
    pub fn play_animators_together(&mut self, ids: &[AnimatorId]) -> Result<(), TychoError> {
        let result = self.play_together_internal(ids);
        self.drain();
        result
    }

    /// Registers every animator, starts the first, and chains each
    /// subsequent start to its predecessor reaching a terminal state.
    pub fn play_animators_sequentially(&mut self, ids: &[AnimatorId]) -> Result<(), TychoError> {
        let result = self.play_sequentially_internal(ids);
        self.drain();
        result
    }

    /// Eases each property present in `target` to its target value.
    ///
    /// See [`motion::ease_to`] for the animator set this produces.
    pub fn ease_to(
        &mut self,
        target: &CameraOptions,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let state = self.camera.state();
        let result = self.run_motion(motion::ease_to(&state, target, options), options);
        self.drain();
        result
    }

    /// Flies the camera to the target along a zoom-out/zoom-in curve.
    ///
    /// See [`motion::fly_to`] for the flight path.
    pub fn fly_to(
        &mut self,
        target: &CameraOptions,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let state = self.camera.state();
        let size = self.transform.size();
        let result = self.run_motion(motion::fly_to(&state, target, size, options), options);
        self.drain();
        result
    }

    /// Pans the map by a screen-space delta.
    pub fn move_by(
        &mut self,
        delta: ScreenVector,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let state = self.camera.state();
        let result = self.run_motion(motion::move_by(&state, delta, options), options);
        self.drain();
        result
    }

    /// Multiplies the camera scale by `amount` about the optional anchor.
    pub fn scale_by(
        &mut self,
        amount: f64,
        anchor: Option<ScreenPoint>,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let state = self.camera.state();
        let result = self.run_motion(motion::scale_by(&state, amount, anchor, options), options);
        self.drain();
        result
    }

    /// Rotates the bearing by the angle between two screen points as seen
    /// from the viewport center.
    pub fn rotate_by(
        &mut self,
        first: ScreenPoint,
        second: ScreenPoint,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let state = self.camera.state();
        let size = self.transform.size();
        let result = self.run_motion(
            motion::rotate_by(&state, first, second, size, options),
            options,
        );
        self.drain();
        result
    }

    /// Tilts the camera by `delta` degrees.
    pub fn pitch_by(
        &mut self,
        delta: f64,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let state = self.camera.state();
        let result = self.run_motion(motion::pitch_by(&state, delta, options), options);
        self.drain();
        result
    }

    /// Cancels whatever part of the motion still runs.
    pub fn cancel_animation(&mut self, handle: &AnimationHandle) -> Result<(), TychoError> {
        let result = self.cancel_handle_internal(handle);
        self.drain();
        result
    }

    /// Cancels every registered animator.
    pub fn cancel_all_animators(&mut self) -> Result<(), TychoError> {
        let result = self.cancel_where(|_| true);
        self.drain();
        result
    }

    /// Cancels every registered animator whose owner tag is not in
    /// `keep_owners`.
    ///
    /// Animators without an owner tag are cancelled as well.
    pub fn cancel_animators_except(&mut self, keep_owners: &[&str]) -> Result<(), TychoError> {
        let result = self.cancel_where(|owner| match owner {
            Some(owner) => !keep_owners.contains(&owner),
            None => true,
        });
        self.drain();
        result
    }

    /// Adds an observer of animator lifecycle transitions.
    pub fn add_lifecycle_observer(&mut self, observer: Rc<dyn CameraAnimationsLifecycleObserver>) {
        self.lifecycle_observers.push(observer);
    }

    /// Removes a previously added lifecycle observer.
    pub fn remove_lifecycle_observer(
        &mut self,
        observer: &Rc<dyn CameraAnimationsLifecycleObserver>,
    ) {
        self.lifecycle_observers
            .retain(|existing| !Rc::ptr_eq(existing, observer));
    }

    /// Adds a listener of committed camera center values.
    pub fn add_center_change_listener(
        &mut self,
        listener: Rc<dyn CameraChangeListener<GeoPoint2d>>,
    ) {
        self.change_listeners.center.push(listener);
    }

    /// Removes a previously added center change listener.
    pub fn remove_center_change_listener(
        &mut self,
        listener: &Rc<dyn CameraChangeListener<GeoPoint2d>>,
    ) {
        self.change_listeners
            .center
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// Adds a listener of committed zoom values.
    pub fn add_zoom_change_listener(&mut self, listener: Rc<dyn CameraChangeListener<f64>>) {
        self.change_listeners.zoom.push(listener);
    }

    /// Removes a previously added zoom change listener.
    pub fn remove_zoom_change_listener(&mut self, listener: &Rc<dyn CameraChangeListener<f64>>) {
        self.change_listeners
            .zoom
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// Adds a listener of committed bearing values.
    pub fn add_bearing_change_listener(&mut self, listener: Rc<dyn CameraChangeListener<f64>>) {
        self.change_listeners.bearing.push(listener);
    }

    /// Removes a previously added bearing change listener.
    pub fn remove_bearing_change_listener(&mut self, listener: &Rc<dyn CameraChangeListener<f64>>) {
        self.change_listeners
            .bearing
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// Adds a listener of committed pitch values.
    pub fn add_pitch_change_listener(&mut self, listener: Rc<dyn CameraChangeListener<f64>>) {
        self.change_listeners.pitch.push(listener);
    }

    /// Removes a previously added pitch change listener.
    pub fn remove_pitch_change_listener(&mut self, listener: &Rc<dyn CameraChangeListener<f64>>) {
        self.change_listeners
            .pitch
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// Adds a listener of committed padding values.
    pub fn add_padding_change_listener(&mut self, listener: Rc<dyn CameraChangeListener<Padding>>) {
        self.change_listeners.padding.push(listener);
    }

    /// Removes a previously added padding change listener.
    pub fn remove_padding_change_listener(
        &mut self,
        listener: &Rc<dyn CameraChangeListener<Padding>>,
    ) {
        self.change_listeners
            .padding
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// Adds a listener of anchor point changes.
    pub fn add_anchor_change_listener(
        &mut self,
        listener: Rc<dyn CameraChangeListener<Option<ScreenPoint>>>,
    ) {
        self.change_listeners.anchor.push(listener);
    }

    /// Removes a previously added anchor change listener.
    pub fn remove_anchor_change_listener(
        &mut self,
        listener: &Rc<dyn CameraChangeListener<Option<ScreenPoint>>>,
    ) {
        self.change_listeners
            .anchor
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// Screen point camera writes currently pivot about.
    pub fn anchor(&self) -> Option<ScreenPoint> {
        self.anchor
    }

    /// Sets the screen point camera writes pivot about.
    ///
    /// While set, every camera write produced by the animators carries the
    /// anchor, so the engine zooms and rotates about that point instead of
    /// the viewport center.
    pub fn set_anchor(&mut self, anchor: Option<ScreenPoint>) {
        self.update_anchor(anchor);
        self.drain();
    }

    /// Advances every animator to the given time.
    ///
    /// This is the rig's clock: the host calls it once per frame while
    /// animations run. Delayed runs begin when their delay elapses, each
    /// running animator produces one value, and completed runs emit their
    /// terminal notifications.
    pub fn animate(&mut self, now: SystemTime) -> Result<(), TychoError> {
        let result = self.animate_internal(now);
        self.drain();
        result
    }

    /// State of the animator, if the rig still holds it.
    pub fn animator_state(&self, id: AnimatorId) -> Option<AnimatorState> {
        self.animators.get(&id).map(|slot| slot.animator.state())
    }

    /// Property type of the animator, if the rig still holds it.
    pub fn animator_type(&self, id: AnimatorId) -> Option<CameraAnimatorType> {
        self.animators
            .get(&id)
            .map(|slot| slot.animator.animator_type().clone())
    }

    /// Owner tag of the animator, if the rig still holds it and the
    /// animator has one.
    pub fn animator_owner(&self, id: AnimatorId) -> Option<&str> {
        self.animators
            .get(&id)
            .and_then(|slot| slot.animator.owner())
    }

    /// Number of registered animators.
    pub fn registered_count(&self) -> usize {
        self.animators
            .values()
            .filter(|slot| slot.registered)
            .count()
    }

    /// Number of animators currently producing values.
    pub fn running_count(&self) -> usize {
        self.animators
            .values()
            .filter(|slot| slot.animator.state() == AnimatorState::Running)
            .count()
    }

    /// Returns true while any animator is producing values.
    pub fn has_running_animations(&self) -> bool {
        self.running_count() > 0
    }

    fn insert(&mut self, animator: CameraAnimator) -> AnimatorId {
        let id = AnimatorId(self.next_id);
        self.next_id += 1;
        self.animators.insert(
            id,
            AnimatorSlot {
                animator,
                registered: false,
                counted: false,
                transient: false,
                sequence_next: None,
            },
        );
        self.start_order.push(id);
        id
    }

    fn unregister_ids(&mut self, ids: &[AnimatorId]) {
        for id in ids {
            let Some(slot) = self.animators.get_mut(id) else {
                log::warn!("Attempt to unregister unknown animator {id:?}");
                continue;
            };
            if !slot.registered {
                continue;
            }
            slot.registered = false;
            if slot.counted {
                slot.counted = false;
                self.release_counted();
            }
        }
    }

    fn play_together_internal(&mut self, ids: &[AnimatorId]) -> Result<(), TychoError> {
        self.register_animators(ids);
        for id in ids {
            self.start_internal(*id)?;
        }
        Ok(())
    }

    fn play_sequentially_internal(&mut self, ids: &[AnimatorId]) -> Result<(), TychoError> {
        self.register_animators(ids);
        for pair in ids.windows(2) {
            if let Some(slot) = self.animators.get_mut(&pair[0]) {
                slot.sequence_next = Some(pair[1]);
            }
        }
        match ids.first() {
            Some(first) => self.start_internal(*first),
            None => Ok(()),
        }
    }

    fn run_motion(
        &mut self,
        animators: Result<Vec<CameraAnimator>, TychoError>,
        options: &AnimationOptions,
    ) -> Result<AnimationHandle, TychoError> {
        let mut animators = animators?;

        let retained = options
            .animator_listener()
            .filter(|_| !options.duration().is_zero())
            .cloned();
        if let (Some(listener), Some(first)) = (options.animator_listener(), animators.first_mut())
        {
            first.add_status_listener(listener.clone());
        }

        let mut ids = Vec::with_capacity(animators.len());
        for animator in animators {
            let id = self.insert(animator);
            if let Some(slot) = self.animators.get_mut(&id) {
                slot.transient = true;
            }
            ids.push(id);
        }
        if let (Some(listener), Some(first)) = (retained, ids.first()) {
            self.motion_listeners.insert(*first, listener);
        }

        self.register_animators(&ids);
        for id in &ids {
            self.start_internal(*id)?;
        }
        Ok(AnimationHandle { ids })
    }

    fn cancel_handle_internal(&mut self, handle: &AnimationHandle) -> Result<(), TychoError> {
        for id in &handle.ids {
            if self.animators.contains_key(id) {
                self.cancel_internal(*id)?;
            }
        }
        Ok(())
    }

    fn cancel_where(&mut self, victim: impl Fn(Option<&str>) -> bool) -> Result<(), TychoError> {
        let ids: Vec<AnimatorId> = self
            .start_order
            .iter()
            .copied()
            .filter(|id| match self.animators.get(id) {
                Some(slot) => slot.registered && victim(slot.animator.owner()),
                None => false,
            })
            .collect();
        for id in ids {
            self.cancel_internal(id)?;
        }
        Ok(())
    }

    fn start_internal(&mut self, id: AnimatorId) -> Result<(), TychoError> {
        let Some(slot) = self.animators.get_mut(&id) else {
            log::warn!("Attempt to start unknown animator {id:?}");
            return Ok(());
        };
        let delay_is_zero = slot.animator.start_delay().is_zero();
        if slot.animator.mark_started() == StartDisposition::Fresh && delay_is_zero {
            self.begin_animator(id)?;
        }
        self.request_redraw();
        Ok(())
    }

    /// Runs the begin sequence: resolve the start value, count the
    /// user-animation flag, announce the start, cancel same-property
    /// running animators, then produce the first value.
    ///
    /// Only animators whose run has begun are interruption victims; a
    /// same-property animator still waiting out its start delay keeps its
    /// turn.
    fn begin_animator(&mut self, id: AnimatorId) -> Result<(), TychoError> {
        let (animator_type, registered, start_override) = {
            let Some(slot) = self.animators.get(&id) else {
                return Ok(());
            };
            (
                slot.animator.animator_type().clone(),
                slot.registered,
                slot.animator.start_value_override(),
            )
        };
        let start = match start_override {
            Some(start) => start,
            None => match self.sample_current(&animator_type) {
                Ok(start) => start,
                Err(err) => {
                    // Leave the animator cancelled rather than stuck in a
                    // pending run that can never begin.
                    self.cancel_internal(id)?;
                    return Err(err);
                }
            },
        };

        if registered {
            log::debug!("Animator {id:?} ({animator_type}) begins");
            // Count before cancelling the animator this one replaces, so
            // the flag never dips false during the handoff.
            self.mark_counted(id);
            self.queue.push_back(Notification::LifecycleStarting { id });

            let victims: Vec<AnimatorId> = self
                .start_order
                .iter()
                .copied()
                .filter(|other| *other != id)
                .filter(|other| match self.animators.get(other) {
                    Some(slot) => {
                        slot.registered
                            && slot.animator.is_begun()
                            && slot.animator.animator_type() == &animator_type
                    }
                    None => false,
                })
                .collect();
            for victim in victims {
                log::debug!(
                    "Animator {id:?} interrupts running {animator_type} animator {victim:?}"
                );
                self.queue.push_back(Notification::LifecycleInterrupting {
                    running: victim,
                    incoming: id,
                });
                self.cancel_internal(victim)?;
            }
        }

        // A sequence chained off a cancelled animator may have started and
        // re-interrupted inside the cascade; begin only if this run is
        // still the pending one.
        let duration_is_zero = {
            let Some(slot) = self.animators.get_mut(&id) else {
                return Ok(());
            };
            if !slot.animator.is_started() || slot.animator.is_begun() {
                return Ok(());
            }
            slot.animator.begin(start);
            slot.animator.duration().is_zero()
        };

        self.queue.push_back(Notification::StatusStart { id });
        self.process_update(id, start)?;

        if duration_is_zero {
            let end = self
                .animators
                .get(&id)
                .and_then(|slot| slot.animator.value_at(1.0));
            if let Some(end) = end {
                self.process_update(id, end)?;
            }
            self.finish_run(id)?;
        }
        Ok(())
    }

    fn animate_internal(&mut self, now: SystemTime) -> Result<(), TychoError> {
        let ids = self.start_order.clone();
        for id in ids {
            {
                let Some(slot) = self.animators.get_mut(&id) else {
                    continue;
                };
                slot.animator.note_tick(now);
            }

            let due = self
                .animators
                .get(&id)
                .is_some_and(|slot| slot.animator.begin_due(now));
            if due {
                self.begin_animator(id)?;
            }

            let (progress, new_cycle) = {
                let Some(slot) = self.animators.get_mut(&id) else {
                    continue;
                };
                if slot.animator.state() != AnimatorState::Running {
                    continue;
                }
                let Some(progress) = slot.animator.progress_at(now) else {
                    continue;
                };
                let new_cycle = !progress.completed && progress.cycle > slot.animator.completed_cycles();
                if new_cycle {
                    slot.animator.set_completed_cycles(progress.cycle);
                }
                (progress, new_cycle)
            };

            if new_cycle {
                self.queue.push_back(Notification::StatusRepeat { id });
            }

            if progress.completed {
                let end = self
                    .animators
                    .get(&id)
                    .and_then(|slot| slot.animator.value_at(1.0));
                if let Some(end) = end {
                    self.process_update(id, end)?;
                }
                self.finish_run(id)?;
            } else if progress.fraction > 0.0 {
                let value = self
                    .animators
                    .get(&id)
                    .and_then(|slot| slot.animator.value_at(progress.fraction));
                if let Some(value) = value {
                    self.process_update(id, value)?;
                }
            }
        }

        if self
            .animators
            .values()
            .any(|slot| slot.animator.is_started())
        {
            self.request_redraw();
        }
        Ok(())
    }

    fn process_update(&mut self, id: AnimatorId, value: CameraValue) -> Result<(), TychoError> {
        let (registered, animator_type) = {
            let Some(slot) = self.animators.get_mut(&id) else {
                return Ok(());
            };
            slot.animator.set_current(value);
            (slot.registered, slot.animator.animator_type().clone())
        };

        self.queue.push_back(Notification::Update { id, value });
        if registered {
            self.commit_value(&animator_type, value)?;
        }
        Ok(())
    }

    /// Applies a produced value: anchor values move the rig anchor, camera
    /// property values are written through the camera delegate with the
    /// current anchor as the pivot, and change listeners are notified when
    /// the committed value differs from the previous one.
    fn commit_value(
        &mut self,
        animator_type: &CameraAnimatorType,
        value: CameraValue,
    ) -> Result<(), TychoError> {
        if matches!(animator_type, CameraAnimatorType::Custom(_)) {
            return Ok(());
        }
        if animator_type == &CameraAnimatorType::Anchor {
            if let Some(point) = value.as_screen() {
                self.update_anchor(Some(point));
            }
            return Ok(());
        }

        let (options, committed) = match (animator_type, value) {
            (CameraAnimatorType::Center, CameraValue::Point(center)) => (
                CameraOptions::new().with_center(center),
                CameraValue::Point(center),
            ),
            (CameraAnimatorType::Zoom, CameraValue::Scalar(zoom)) => {
                (CameraOptions::new().with_zoom(zoom), CameraValue::Scalar(zoom))
            }
            (CameraAnimatorType::Bearing, CameraValue::Scalar(bearing)) => {
                let bearing = normalize_bearing(bearing);
                (
                    CameraOptions::new().with_bearing(bearing),
                    CameraValue::Scalar(bearing),
                )
            }
            (CameraAnimatorType::Pitch, CameraValue::Scalar(pitch)) => {
                (CameraOptions::new().with_pitch(pitch), CameraValue::Scalar(pitch))
            }
            (CameraAnimatorType::Padding, CameraValue::Padding(padding)) => (
                CameraOptions::new().with_padding(padding),
                CameraValue::Padding(padding),
            ),
            _ => {
                log::error!("Animator of type {animator_type} produced a mismatched value");
                return Ok(());
            }
        };
        let options = match self.anchor {
            Some(anchor) => options.with_anchor(anchor),
            None => options,
        };

        if let Err(err) = self.camera.set_camera(&options) {
            log::error!("Camera write for {animator_type} failed: {err}");
            return Err(err);
        }

        let changed = self.committed.get(animator_type) != Some(&committed);
        self.committed.insert(animator_type.clone(), committed);
        if changed {
            self.queue.push_back(Notification::CameraChange {
                animator_type: animator_type.clone(),
                value: committed,
            });
        }
        Ok(())
    }

    fn update_anchor(&mut self, anchor: Option<ScreenPoint>) {
        let changed = match (self.anchor, anchor) {
            (Some(previous), Some(new)) => previous != new,
            (None, None) => false,
            _ => true,
        };
        self.anchor = anchor;
        if changed {
            self.queue.push_back(Notification::AnchorChange { anchor });
        }
    }

    fn finish_run(&mut self, id: AnimatorId) -> Result<(), TychoError> {
        let (registered, last, animator_type, next, transient, was_counted) = {
            let Some(slot) = self.animators.get_mut(&id) else {
                return Ok(());
            };
            slot.animator.finish();
            let was_counted = slot.counted;
            slot.counted = false;
            (
                slot.registered,
                slot.animator.current_value(),
                slot.animator.animator_type().clone(),
                slot.sequence_next.take(),
                slot.transient,
                was_counted,
            )
        };

        if registered {
            self.queue.push_back(Notification::LifecycleEnding { id });
        }
        self.queue.push_back(Notification::StatusEnd { id });

        // One extra write of the final value, so the committed camera
        // state always matches where the run ended.
        if registered {
            if let Some(value) = last {
                self.commit_value(&animator_type, value)?;
            }
        }
        if was_counted {
            self.release_counted();
        }
        self.motion_listeners.remove(&id);
        if transient {
            self.unregister_ids(&[id]);
        }
        if let Some(next) = next {
            self.start_internal(next)?;
        }
        Ok(())
    }

    fn cancel_internal(&mut self, id: AnimatorId) -> Result<(), TychoError> {
        let (run, registered, animator_type, next, transient, was_counted) = {
            let Some(slot) = self.animators.get_mut(&id) else {
                log::warn!("Attempt to cancel unknown animator {id:?}");
                return Ok(());
            };
            let Some(run) = slot.animator.cancel() else {
                return Ok(());
            };
            let was_counted = slot.counted;
            slot.counted = false;
            (
                run,
                slot.registered,
                slot.animator.animator_type().clone(),
                slot.sequence_next.take(),
                slot.transient,
                was_counted,
            )
        };

        log::debug!("Animator {id:?} ({animator_type}) run cancelled");
        if registered {
            self.queue.push_back(Notification::LifecycleCancelling { id });
        }
        self.queue.push_back(Notification::StatusCancel { id });
        self.queue.push_back(Notification::StatusEnd { id });

        if registered && run.begun {
            if let Some(value) = run.value {
                self.commit_value(&animator_type, value)?;
            }
        }
        if was_counted {
            self.release_counted();
        }
        self.motion_listeners.remove(&id);
        if transient {
            self.unregister_ids(&[id]);
        }
        if let Some(next) = next {
            self.start_internal(next)?;
        }
        Ok(())
    }

    fn mark_counted(&mut self, id: AnimatorId) {
        if let Some(slot) = self.animators.get_mut(&id) {
            if !slot.counted {
                slot.counted = true;
                self.counted_running += 1;
            }
        }
        self.transform.set_user_animation_in_progress(true);
    }

    fn release_counted(&mut self) {
        self.counted_running = self.counted_running.saturating_sub(1);
        if self.counted_running == 0 {
            self.transform.set_user_animation_in_progress(false);
        }
    }

    fn sample_current(
        &self,
        animator_type: &CameraAnimatorType,
    ) -> Result<CameraValue, TychoError> {
        let state = self.camera.state();
        match animator_type {
            CameraAnimatorType::Center => Ok(CameraValue::Point(state.center())),
            CameraAnimatorType::Zoom => Ok(CameraValue::Scalar(state.zoom())),
            CameraAnimatorType::Bearing => Ok(CameraValue::Scalar(state.bearing())),
            CameraAnimatorType::Pitch => Ok(CameraValue::Scalar(state.pitch())),
            CameraAnimatorType::Padding => Ok(CameraValue::Padding(state.padding())),
            CameraAnimatorType::Anchor => match self.anchor {
                Some(anchor) => Ok(CameraValue::Screen(anchor)),
                None => Err(TychoError::InvalidAnimator(
                    "anchor animator has no start value and the rig has no anchor".to_string(),
                )),
            },
            CameraAnimatorType::Custom(name) => Err(TychoError::InvalidAnimator(format!(
                "custom animator {name} has no start value"
            ))),
        }
    }

    fn request_redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    /// Delivers queued notifications in transition order, then prunes
    /// finished slots. Nested calls return immediately; the outermost
    /// public call empties the queue.
    fn drain(&mut self) {
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        while let Some(notification) = self.queue.pop_front() {
            self.dispatch(notification);
        }
        self.dispatching = false;
        self.sweep();
    }

    fn dispatch(&mut self, notification: Notification) {
        match notification {
            Notification::LifecycleStarting { id } => {
                let Some((animator_type, owner)) = self.lifecycle_details(id) else {
                    return;
                };
                for observer in self.lifecycle_observers.clone() {
                    observer.on_animator_starting(self, id, &animator_type, owner.as_deref());
                }
            }
            Notification::LifecycleInterrupting { running, incoming } => {
                let Some((animator_type, running_owner)) = self.lifecycle_details(running) else {
                    return;
                };
                let incoming_owner = self
                    .animators
                    .get(&incoming)
                    .and_then(|slot| slot.animator.owner().map(String::from));
                for observer in self.lifecycle_observers.clone() {
                    observer.on_animator_interrupting(
                        self,
                        &animator_type,
                        running,
                        running_owner.as_deref(),
                        incoming,
                        incoming_owner.as_deref(),
                    );
                }
            }
            Notification::LifecycleEnding { id } => {
                let Some((animator_type, owner)) = self.lifecycle_details(id) else {
                    return;
                };
                for observer in self.lifecycle_observers.clone() {
                    observer.on_animator_ending(self, id, &animator_type, owner.as_deref());
                }
            }
            Notification::LifecycleCancelling { id } => {
                let Some((animator_type, owner)) = self.lifecycle_details(id) else {
                    return;
                };
                for observer in self.lifecycle_observers.clone() {
                    observer.on_animator_cancelling(self, id, &animator_type, owner.as_deref());
                }
            }
            Notification::StatusStart { id } => {
                for listener in self.status_listeners(id) {
                    listener.on_animator_start(self, id);
                }
            }
            Notification::StatusEnd { id } => {
                for listener in self.status_listeners(id) {
                    listener.on_animator_end(self, id);
                }
            }
            Notification::StatusCancel { id } => {
                for listener in self.status_listeners(id) {
                    listener.on_animator_cancel(self, id);
                }
            }
            Notification::StatusRepeat { id } => {
                for listener in self.status_listeners(id) {
                    listener.on_animator_repeat(self, id);
                }
            }
            Notification::Update { id, value } => {
                let listeners = match self.animators.get(&id) {
                    Some(slot) => slot.animator.update_listeners().to_vec(),
                    None => return,
                };
                for listener in listeners {
                    listener.on_animator_update(self, id, &value);
                }
            }
            Notification::CameraChange {
                animator_type,
                value,
            } => match (&animator_type, value) {
                (CameraAnimatorType::Center, CameraValue::Point(center)) => {
                    for listener in self.change_listeners.center.clone() {
                        listener.on_camera_change(self, &center);
                    }
                }
                (CameraAnimatorType::Zoom, CameraValue::Scalar(zoom)) => {
                    for listener in self.change_listeners.zoom.clone() {
                        listener.on_camera_change(self, &zoom);
                    }
                }
                (CameraAnimatorType::Bearing, CameraValue::Scalar(bearing)) => {
                    for listener in self.change_listeners.bearing.clone() {
                        listener.on_camera_change(self, &bearing);
                    }
                }
                (CameraAnimatorType::Pitch, CameraValue::Scalar(pitch)) => {
                    for listener in self.change_listeners.pitch.clone() {
                        listener.on_camera_change(self, &pitch);
                    }
                }
                (CameraAnimatorType::Padding, CameraValue::Padding(padding)) => {
                    for listener in self.change_listeners.padding.clone() {
                        listener.on_camera_change(self, &padding);
                    }
                }
                _ => {}
            },
            Notification::AnchorChange { anchor } => {
                for listener in self.change_listeners.anchor.clone() {
                    listener.on_camera_change(self, &anchor);
                }
            }
        }
    }

    fn lifecycle_details(&self, id: AnimatorId) -> Option<(CameraAnimatorType, Option<String>)> {
        self.animators.get(&id).map(|slot| {
            (
                slot.animator.animator_type().clone(),
                slot.animator.owner().map(String::from),
            )
        })
    }

    fn status_listeners(&self, id: AnimatorId) -> Vec<Rc<dyn AnimatorStatusListener>> {
        match self.animators.get(&id) {
            Some(slot) => slot.animator.status_listeners().to_vec(),
            None => Vec::new(),
        }
    }

    /// Forgets slots whose run is over and which are no longer
    /// registered. Runs after the notification queue empties, so terminal
    /// callbacks can still query the slot.
    fn sweep(&mut self) {
        let dead: Vec<AnimatorId> = self
            .animators
            .iter()
            .filter(|(_, slot)| !slot.registered && slot.animator.state().is_terminal())
            .map(|(id, _)| *id)
            .collect();
        if dead.is_empty() {
            return;
        }
        for id in &dead {
            self.animators.remove(id);
            self.motion_listeners.remove(id);
        }
        self.start_order.retain(|id| self.animators.contains_key(id));
    }
}
