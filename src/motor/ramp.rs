// Ramped per-wheel position controller
//
// A raw position seek at constant speed overshoots or oscillates near the
// goal because actuator braking is not instantaneous. This controller runs a
// background loop that re-commands the seek every period with a speed that
// scales down linearly inside a deceleration zone in front of the target,
// then hard-stops inside the tolerance band.

use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::config::RampConfig;
use crate::motor::actuator::{Result, WheelActuator};

/// Parameters and status of the current move. Kept behind one mutex so a
/// control-loop iteration always works on a consistent snapshot, and so the
/// epoch check below can reject stale completion verdicts.
#[derive(Debug, Clone, Copy)]
struct MoveState {
    target: i32,
    speed: i32,
    tolerance: i32,
    active: bool,
    done: bool,
    /// Bumped by every new move and every stop. An iteration that loaded
    /// its snapshot before the bump must not latch done/active afterwards.
    epoch: u64,
}

struct RampShared {
    state: Mutex<MoveState>,
    shutdown: AtomicBool,
}

impl RampShared {
    fn state(&self) -> MutexGuard<'_, MoveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct RampedController {
    shared: Arc<RampShared>,
    actuator: Arc<Mutex<Box<dyn WheelActuator>>>,
    thread: Option<JoinHandle<()>>,
}

impl RampedController {
    /// Wrap an actuator and start its control loop thread.
    pub fn spawn(actuator: impl WheelActuator + 'static, config: RampConfig) -> Self {
        let shared = Arc::new(RampShared {
            state: Mutex::new(MoveState {
                target: 0,
                speed: 0,
                tolerance: config.tolerance,
                active: false,
                done: false,
                epoch: 0,
            }),
            shutdown: AtomicBool::new(false),
        });
        let actuator: Arc<Mutex<Box<dyn WheelActuator>>> =
            Arc::new(Mutex::new(Box::new(actuator)));

        let thread = {
            let shared = Arc::clone(&shared);
            let actuator = Arc::clone(&actuator);
            thread::spawn(move || control_loop(&shared, &actuator, &config))
        };

        Self {
            shared,
            actuator,
            thread: Some(thread),
        }
    }

    /// Begin a move to `current + delta_ticks`. Non-blocking; the control
    /// loop takes over from here.
    pub fn move_relative(&self, speed: i32, delta_ticks: i32) -> Result<()> {
        let target = {
            let mut actuator = lock(&self.actuator);
            actuator.position()? + delta_ticks
        };
        self.begin(speed, target);
        Ok(())
    }

    /// Begin a move to an absolute tick target. Non-blocking.
    pub fn move_absolute(&self, speed: i32, target_ticks: i32) {
        self.begin(speed, target_ticks);
    }

    fn begin(&self, speed: i32, target: i32) {
        let mut state = self.shared.state();
        state.target = target;
        state.speed = speed;
        state.done = false;
        state.active = true;
        state.epoch += 1;
    }

    /// A wheel with no active move reports done.
    pub fn is_done(&self) -> bool {
        let state = self.shared.state();
        !state.active || state.done
    }

    /// Busy-poll until the current move finishes. A move that never reaches
    /// tolerance never returns; that is surfaced, not masked.
    pub fn block_until_done(&self) {
        while !self.is_done() {
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    /// Abort the current move and hard-stop the wheel. `done` keeps its
    /// last value.
    pub fn stop(&self) -> Result<()> {
        self.deactivate();
        lock(&self.actuator).stop()
    }

    /// Set how far the wheel may sit from the target and still count as
    /// arrived.
    pub fn set_tolerance(&self, ticks: i32) {
        self.shared.state().tolerance = ticks;
    }

    /// Re-zero the wheel's encoder, if the actuator supports it.
    pub fn clear_position_counter(&self) -> Result<()> {
        lock(&self.actuator).clear_position_counter()
    }

    /// Cut power to the wheel, if the actuator supports it.
    pub fn off(&self) -> Result<()> {
        self.deactivate();
        lock(&self.actuator).off()
    }

    pub fn position(&self) -> Result<i32> {
        lock(&self.actuator).position()
    }

    /// Clear `active` and invalidate any iteration still working on the old
    /// move, so it cannot retro-latch `done`.
    fn deactivate(&self) {
        let mut state = self.shared.state();
        state.active = false;
        state.epoch += 1;
    }
}

impl Drop for RampedController {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        if let Err(e) = lock(&self.actuator).stop() {
            warn!("failed to stop wheel on teardown: {e}");
        }
    }
}

fn lock<'a>(
    actuator: &'a Arc<Mutex<Box<dyn WheelActuator>>>,
) -> std::sync::MutexGuard<'a, Box<dyn WheelActuator>> {
    actuator.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Speed to command when `delta` ticks remain: inside the deceleration zone
/// it falls off linearly, floored at `min_speed` and capped at the
/// commanded speed.
fn scaled_speed(speed: i32, delta: i32, config: &RampConfig) -> i32 {
    let decel_start = ((speed + config.decel_offset) / config.decel_divisor).max(1);
    if delta < decel_start {
        (speed * delta / decel_start + config.min_speed).min(speed)
    } else {
        speed
    }
}

fn control_loop(
    shared: &RampShared,
    actuator: &Arc<Mutex<Box<dyn WheelActuator>>>,
    config: &RampConfig,
) {
    while !shared.shutdown.load(SeqCst) {
        let snapshot = *shared.state();
        if !snapshot.active {
            thread::sleep(config.idle_period());
            continue;
        }

        {
            let mut actuator = lock(actuator);
            let position = match actuator.position() {
                Ok(p) => p,
                Err(e) => {
                    warn!("encoder read failed, retrying next period: {e}");
                    drop(actuator);
                    thread::sleep(config.loop_period());
                    continue;
                }
            };

            let delta = (position - snapshot.target).abs();
            if delta <= snapshot.tolerance {
                if let Err(e) = actuator.stop() {
                    warn!("stop at target failed: {e}");
                }
                let mut state = shared.state();
                if state.epoch == snapshot.epoch {
                    state.done = true;
                    state.active = false;
                    debug!(position, target = snapshot.target, "wheel target reached");
                }
                // On an epoch mismatch a new move replaced this one while
                // the iteration was in flight; the spurious stop above is
                // undone by the seek the next iteration issues.
                continue;
            }

            let commanded = scaled_speed(snapshot.speed, delta, config);
            if let Err(e) = actuator.move_to_position(commanded, snapshot.target) {
                warn!("seek command failed, retrying next period: {e}");
            }
        }

        thread::sleep(config.loop_period());
    }
}
