// Motion runtime for a two-wheeled differential-drive base
//
// Layers, bottom up:
// - motor: wheel actuator capability trait, a serial servo backend, and the
//   ramped per-wheel position controller
// - drive: tick kinematics, the dual-wheel driver, the dead-reckoned pose
//   model and the motion command sequencer

pub mod config;
pub mod drive;
pub mod motor;
pub mod retcode;

pub use config::RobotConfig;
pub use drive::{Drivetrain, DualDrive, MotionCommand, MotionSequencer, Pose};
pub use motor::{ActuatorError, RampedController, WheelActuator};
pub use retcode::Retcode;
