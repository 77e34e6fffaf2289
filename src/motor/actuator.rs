// Wheel actuator capability boundary
//
// Everything above this trait is hardware-agnostic: the ramped controller and
// the drive layers only ever talk to a `WheelActuator`.

use crate::motor::bus::BusError;

/// Errors from a wheel actuator backend.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("servo bus error: {0}")]
    Bus(#[from] BusError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation `{op}` not supported by this actuator")]
    Unsupported { op: &'static str },
}

pub type Result<T> = std::result::Result<T, ActuatorError>;

/// Capability set of one wheel: set velocity, seek a tick target at a given
/// speed, read the encoder, stop.
///
/// Tick counts are signed and unbounded; backends with single-turn encoders
/// are expected to unwrap them. Speeds are in ticks per second, always
/// positive for position seeks (direction comes from the target).
pub trait WheelActuator: Send {
    /// Spin at a signed velocity until told otherwise.
    fn move_at_velocity(&mut self, velocity: i32) -> Result<()>;

    /// Head toward an absolute tick target at the given speed. The caller
    /// re-issues this as its speed profile changes; the actuator does not
    /// have to stop on its own when the target is reached.
    fn move_to_position(&mut self, speed: i32, target_ticks: i32) -> Result<()>;

    /// Head toward `current + delta` ticks. The target is computed here,
    /// from a fresh encoder read, not by the actuator.
    fn move_relative(&mut self, speed: i32, delta_ticks: i32) -> Result<()> {
        let target = self.position()? + delta_ticks;
        self.move_to_position(speed, target)
    }

    /// Current encoder count in ticks. May be negative.
    fn position(&mut self) -> Result<i32>;

    /// Hard stop.
    fn stop(&mut self) -> Result<()>;

    /// Cut power entirely. Optional capability.
    fn off(&mut self) -> Result<()> {
        Err(ActuatorError::Unsupported { op: "off" })
    }

    /// Re-zero the encoder count. Optional capability.
    fn clear_position_counter(&mut self) -> Result<()> {
        Err(ActuatorError::Unsupported { op: "clear_position_counter" })
    }
}
