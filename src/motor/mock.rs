// In-memory wheel used by the ramp and drive tests
//
// Models an ideal wheel: every `move_to_position` call advances the encoder
// toward the target by `speed / 10` ticks (at least one), so a re-issuing
// controller always converges.

use std::sync::{Arc, Mutex, PoisonError};

use crate::motor::actuator::{Result, WheelActuator};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub position: i32,
    /// Every (speed, target) pair issued via move_to_position.
    pub seeks: Vec<(i32, i32)>,
    pub velocities: Vec<i32>,
    pub stops: usize,
}

pub(crate) struct MockWheel {
    state: Arc<Mutex<MockState>>,
}

impl MockWheel {
    pub(crate) fn new() -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WheelActuator for MockWheel {
    fn move_at_velocity(&mut self, velocity: i32) -> Result<()> {
        self.state().velocities.push(velocity);
        Ok(())
    }

    fn move_to_position(&mut self, speed: i32, target_ticks: i32) -> Result<()> {
        let mut state = self.state();
        state.seeks.push((speed, target_ticks));
        let remaining = target_ticks - state.position;
        let step = (speed.abs() / 10).max(1).min(remaining.abs());
        state.position += step * remaining.signum();
        Ok(())
    }

    fn position(&mut self) -> Result<i32> {
        Ok(self.state().position)
    }

    fn stop(&mut self) -> Result<()> {
        self.state().stops += 1;
        Ok(())
    }

    fn clear_position_counter(&mut self) -> Result<()> {
        self.state().position = 0;
        Ok(())
    }
}
