// Serial-servo wheel: WheelActuator over the shared bus
//
// The servos run in velocity mode with a single-turn 0..4095 encoder, so a
// position seek is a signed velocity toward the target (re-issued every
// control period by the ramped controller) and the signed tick count is
// unwrapped from successive single-turn readings.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::motor::actuator::{ActuatorError, Result, WheelActuator};
use crate::motor::bus::{ServoBus, ServoMode};

/// Servo bus ids of the two wheels (as configured in the servos).
pub const LEFT_WHEEL_ID: u8 = 1;
pub const RIGHT_WHEEL_ID: u8 = 2;

/// Encoder counts per revolution of the servo.
const TICKS_PER_TURN: i32 = 4096;

/// Turns single-turn encoder readings into a signed, unbounded tick count.
#[derive(Debug, Default)]
struct TickUnwrapper {
    /// Last raw reading, for wrap detection.
    last_raw: Option<u16>,
    /// Unwrapped count since the first reading.
    ticks: i32,
    /// Subtracted from `ticks` so the counter can be re-zeroed.
    zero_offset: i32,
}

impl TickUnwrapper {
    /// Fold in a fresh reading and return the rebased count. The first
    /// reading primes the counter at zero. Assumes less than half a turn of
    /// travel between readings.
    fn feed(&mut self, raw: u16) -> i32 {
        if let Some(last) = self.last_raw {
            let mut diff = i32::from(raw) - i32::from(last);
            if diff > TICKS_PER_TURN / 2 {
                diff -= TICKS_PER_TURN;
            } else if diff < -TICKS_PER_TURN / 2 {
                diff += TICKS_PER_TURN;
            }
            self.ticks += diff;
        }
        self.last_raw = Some(raw);
        self.ticks - self.zero_offset
    }

    fn rezero(&mut self) {
        self.zero_offset = self.ticks;
    }
}

pub struct SerialWheel {
    bus: Arc<Mutex<ServoBus>>,
    id: u8,
    counter: TickUnwrapper,
}

impl SerialWheel {
    pub fn new(bus: Arc<Mutex<ServoBus>>, id: u8) -> Self {
        Self {
            bus,
            id,
            counter: TickUnwrapper::default(),
        }
    }

    /// Put the servo in velocity mode with torque on and prime the tick
    /// counter. Must be called before issuing moves.
    pub fn initialize(&mut self) -> Result<()> {
        info!(id = self.id, "initializing wheel servo");
        {
            let mut bus = self.lock_bus();
            bus.set_torque(self.id, false)?;
            bus.set_mode(self.id, ServoMode::Velocity)?;
            bus.set_torque(self.id, true)?;
        }
        self.position()?;
        Ok(())
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    fn lock_bus(&self) -> MutexGuard<'_, ServoBus> {
        // A poisoned bus mutex only means another wheel's thread panicked;
        // the bus itself is still usable.
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WheelActuator for SerialWheel {
    fn move_at_velocity(&mut self, velocity: i32) -> Result<()> {
        let clamped = velocity.clamp(i32::from(i16::MIN) + 1, i32::from(i16::MAX)) as i16;
        self.lock_bus().set_velocity(self.id, clamped)?;
        Ok(())
    }

    fn move_to_position(&mut self, speed: i32, target_ticks: i32) -> Result<()> {
        let current = self.position()?;
        let error = target_ticks - current;
        let velocity = if error == 0 {
            0
        } else {
            speed.abs() * error.signum()
        };
        debug!(id = self.id, current, target_ticks, velocity, "wheel seek");
        self.move_at_velocity(velocity)
    }

    fn position(&mut self) -> Result<i32> {
        let raw = self.lock_bus().present_position(self.id)?;
        Ok(self.counter.feed(raw))
    }

    fn stop(&mut self) -> Result<()> {
        self.move_at_velocity(0)
    }

    fn off(&mut self) -> Result<()> {
        self.lock_bus()
            .set_torque(self.id, false)
            .map_err(ActuatorError::from)
    }

    fn clear_position_counter(&mut self) -> Result<()> {
        self.position()?;
        self.counter.rezero();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_counts_forward_across_the_seam() {
        let mut c = TickUnwrapper::default();
        assert_eq!(c.feed(4000), 0); // first read primes
        assert_eq!(c.feed(4090), 90);
        assert_eq!(c.feed(10), 106); // wrapped 4095 -> 0
        assert_eq!(c.feed(500), 596);
    }

    #[test]
    fn unwrap_counts_backward_across_the_seam() {
        let mut c = TickUnwrapper::default();
        assert_eq!(c.feed(100), 0);
        assert_eq!(c.feed(4000), -196);
        assert_eq!(c.feed(3500), -696);
    }

    #[test]
    fn rezero_rebases_the_counter() {
        let mut c = TickUnwrapper::default();
        c.feed(0);
        assert_eq!(c.feed(1000), 1000);
        c.rezero();
        assert_eq!(c.feed(1200), 200);
    }
}
