//! This example shows how to drive the camera rig from a plain loop without
//! a map renderer. It flies the camera from Berlin to Sydney and logs the
//! camera state a few times per second of flight.
//!
//! ```shell
//! cargo run --example flyover
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tycho::delegate::{MapCamera, MapTransform};
use tycho::error::TychoError;
use tycho::{AnimationOptions, CameraRig};
use tycho_types::geo::GeoPoint;
use tycho_types::{latlon, CameraOptions, CameraState, Padding, Size};
use web_time::SystemTime;

#[derive(Clone)]
struct ConsoleCamera {
    state: Rc<RefCell<CameraState>>,
}

impl MapCamera for ConsoleCamera {
    fn state(&self) -> CameraState {
        *self.state.borrow()
    }

    fn set_camera(&mut self, options: &CameraOptions) -> Result<(), TychoError> {
        let next = self.state.borrow().apply(options);
        *self.state.borrow_mut() = next;
        Ok(())
    }
}

struct ConsoleTransform;

impl MapTransform for ConsoleTransform {
    fn set_user_animation_in_progress(&mut self, in_progress: bool) {
        log::info!("user animation in progress: {in_progress}");
    }

    fn size(&self) -> Size {
        Size::new(1280.0, 800.0)
    }
}

fn main() -> Result<(), TychoError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let state = Rc::new(RefCell::new(CameraState::new(
        latlon!(52.52, 13.405),
        Padding::default(),
        10.0,
        0.0,
        0.0,
    )));
    let camera = ConsoleCamera {
        state: state.clone(),
    };
    let mut rig = CameraRig::new(camera, ConsoleTransform);

    let target = CameraOptions::new()
        .with_center(latlon!(-33.8688, 151.2093))
        .with_zoom(11.0)
        .with_bearing(25.0);
    rig.fly_to(
        &target,
        &AnimationOptions::new()
            .with_duration(Duration::from_secs(4))
            .with_owner("flyover"),
    )?;

    let start = SystemTime::now();
    let frame_time = Duration::from_millis(16);
    let mut frame = 0u32;
    while rig.has_running_animations() {
        rig.animate(start + frame_time * frame)?;
        frame += 1;

        if frame % 32 == 0 {
            let state = state.borrow();
            log::info!(
                "t={:>5}ms center=({:.3}, {:.3}) zoom={:.2} bearing={:.1}",
                (frame_time * frame).as_millis(),
                state.center().lat(),
                state.center().lon(),
                state.zoom(),
                state.bearing(),
            );
        }
    }

    let state = state.borrow();
    log::info!(
        "arrived at ({:.4}, {:.4}) zoom {:.2} after {} frames",
        state.center().lat(),
        state.center().lon(),
        state.zoom(),
        frame
    );
    Ok(())
}
