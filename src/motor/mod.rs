// Wheel motor layer
//
// Provides:
// - the WheelActuator capability trait every backend implements
// - a serial servo bus backend (velocity-mode servos, unwrapped encoders)
// - the ramped position controller that runs one control loop per wheel

pub mod actuator;
pub mod bus;
pub mod ramp;
pub mod wheel;

#[cfg(test)]
pub(crate) mod mock;

pub use actuator::{ActuatorError, WheelActuator};
pub use bus::{BusError, ServoBus};
pub use ramp::RampedController;
pub use wheel::SerialWheel;
