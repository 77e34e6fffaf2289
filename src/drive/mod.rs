// Drive layer
//
// Provides:
// - tick kinematics (logical command -> per-wheel tick deltas)
// - the dual-wheel driver pairing two ramped controllers
// - the dead-reckoned pose model
// - the motion sequencer that executes queued commands in order

pub mod dual;
pub mod kinematics;
pub mod pose;
pub mod sequencer;

pub use dual::DualDrive;
pub use kinematics::WheelTicks;
pub use pose::Pose;
pub use sequencer::{MotionCommand, MotionSequencer};

use crate::motor::actuator::Result;

/// What the sequencer needs from a drivetrain. Implemented by [`DualDrive`]
/// and by recording stubs in tests.
pub trait Drivetrain: Send {
    /// Begin a straight move of the signed distance. Non-blocking.
    fn drive(&mut self, speed: i32, distance_cm: f64) -> Result<()>;

    /// Begin an on-the-spot turn by the signed angle. Non-blocking.
    fn turn(&mut self, speed: i32, angle_rad: f64) -> Result<()>;

    /// True once every wheel of the last command has reached its target.
    fn is_done(&self) -> bool;

    /// Hard-stop all wheels.
    fn stop(&mut self) -> Result<()>;
}
