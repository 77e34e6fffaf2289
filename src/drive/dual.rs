// Dual-wheel motion driver
//
// Pairs the two ramped wheel controllers and turns one logical command into
// two correctly-signed per-wheel moves. Pose bookkeeping is deliberately not
// here; that belongs to the sequencer.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::{DriveConfig, RampConfig};
use crate::drive::kinematics::{straight_ticks, turn_ticks};
use crate::drive::Drivetrain;
use crate::motor::actuator::{Result, WheelActuator};
use crate::motor::ramp::RampedController;

pub struct DualDrive {
    left: RampedController,
    right: RampedController,
    config: DriveConfig,
}

impl DualDrive {
    pub fn new(left: RampedController, right: RampedController, config: DriveConfig) -> Self {
        Self {
            left,
            right,
            config,
        }
    }

    /// Convenience: wrap two bare actuators in ramped controllers.
    pub fn from_actuators(
        left: impl WheelActuator + 'static,
        right: impl WheelActuator + 'static,
        ramp: RampConfig,
        config: DriveConfig,
    ) -> Self {
        Self::new(
            RampedController::spawn(left, ramp.clone()),
            RampedController::spawn(right, ramp),
            config,
        )
    }

    /// Begin a straight move. Both wheels are commanded before either is
    /// polled, so they run concurrently.
    pub fn drive(&self, speed: i32, distance_cm: f64) -> Result<()> {
        let ticks = straight_ticks(&self.config, distance_cm);
        debug!(distance_cm, ?ticks, "drive");
        self.left.move_relative(speed, ticks.left)?;
        self.right.move_relative(speed, ticks.right)?;
        Ok(())
    }

    /// Begin an on-the-spot turn; the wheels counter-rotate.
    pub fn turn(&self, speed: i32, angle_rad: f64) -> Result<()> {
        let ticks = turn_ticks(&self.config, angle_rad);
        debug!(angle_rad, ?ticks, "turn");
        self.left.move_relative(speed, ticks.left)?;
        self.right.move_relative(speed, ticks.right)?;
        Ok(())
    }

    /// True once both wheels report done.
    pub fn is_done(&self) -> bool {
        self.left.is_done() && self.right.is_done()
    }

    /// Busy-poll both wheels to completion.
    pub fn block_until_done(&self) {
        while !self.is_done() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Hard-stop both wheels; the second is stopped even if the first
    /// errors.
    pub fn stop(&self) -> Result<()> {
        let left = self.left.stop();
        let right = self.right.stop();
        left.and(right)
    }

    pub fn set_tolerance(&self, ticks: i32) {
        self.left.set_tolerance(ticks);
        self.right.set_tolerance(ticks);
    }

    /// Re-zero both encoders, for actuators that support it.
    pub fn reset_position_counters(&self) -> Result<()> {
        self.left.clear_position_counter()?;
        self.right.clear_position_counter()
    }

    /// Cut power to both wheels, for actuators that support it.
    pub fn off(&self) -> Result<()> {
        let left = self.left.off();
        let right = self.right.off();
        left.and(right)
    }
}

impl Drivetrain for DualDrive {
    fn drive(&mut self, speed: i32, distance_cm: f64) -> Result<()> {
        DualDrive::drive(self, speed, distance_cm)
    }

    fn turn(&mut self, speed: i32, angle_rad: f64) -> Result<()> {
        DualDrive::turn(self, speed, angle_rad)
    }

    fn is_done(&self) -> bool {
        DualDrive::is_done(self)
    }

    fn stop(&mut self) -> Result<()> {
        DualDrive::stop(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::mock::{MockState, MockWheel};
    use std::f64::consts::FRAC_PI_2;
    use std::sync::{Arc, Mutex};

    fn rig() -> (DualDrive, Arc<Mutex<MockState>>, Arc<Mutex<MockState>>) {
        let (left, left_state) = MockWheel::new();
        let (right, right_state) = MockWheel::new();
        let ramp = RampConfig {
            loop_period_ms: 1,
            idle_period_ms: 1,
            tolerance: 0,
            ..RampConfig::default()
        };
        let drive = DualDrive::from_actuators(left, right, ramp, DriveConfig::default());
        (drive, left_state, right_state)
    }

    #[test]
    fn straight_move_drives_both_wheels_the_same_way() {
        let (drive, left, right) = rig();
        drive.drive(500, 10.0).unwrap();
        drive.block_until_done();
        assert_eq!(left.lock().unwrap().position, 230);
        assert_eq!(right.lock().unwrap().position, 230);
    }

    #[test]
    fn turn_counter_rotates_the_wheels() {
        let (drive, left, right) = rig();
        drive.turn(500, FRAC_PI_2).unwrap();
        drive.block_until_done();
        let l = left.lock().unwrap().position;
        let r = right.lock().unwrap().position;
        assert!(l < 0 && r > 0, "left {l}, right {r}");
        assert_eq!(l, -r);
    }

    #[test]
    fn out_and_back_returns_to_the_start_ticks() {
        let (drive, left, right) = rig();
        drive.drive(500, 33.3).unwrap();
        drive.block_until_done();
        drive.drive(500, -33.3).unwrap();
        drive.block_until_done();
        assert_eq!(left.lock().unwrap().position, 0);
        assert_eq!(right.lock().unwrap().position, 0);
    }

    #[test]
    fn done_only_when_both_wheels_are() {
        let (drive, _left, _right) = rig();
        assert!(drive.is_done());
        drive.drive(500, 400.0).unwrap();
        assert!(!drive.is_done());
        drive.block_until_done();
        assert!(drive.is_done());
    }
}
