// Per-robot tuning: geometry, calibration multipliers, loop timing
//
// Every figure here is a calibrated default, not a law; robots load their own
// values from a JSON file at startup.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default serial port for the wheel servo bus.
pub const DEFAULT_MOTOR_PORT: &str = "/dev/ttyUSB0";

/// Tuning for the per-wheel ramped position controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    /// Control loop period in milliseconds.
    pub loop_period_ms: u64,
    /// Sleep while no move is active, in milliseconds.
    pub idle_period_ms: u64,
    /// Slowest speed the controller will decelerate to (ticks/s).
    pub min_speed: i32,
    /// Deceleration starts `(speed + decel_offset) / decel_divisor` ticks
    /// before the target.
    pub decel_offset: i32,
    pub decel_divisor: i32,
    /// Acceptance band around the target, in ticks.
    pub tolerance: i32,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            loop_period_ms: 50,
            idle_period_ms: 1,
            min_speed: 20,
            decel_offset: 500,
            decel_divisor: 10,
            tolerance: 0,
        }
    }
}

impl RampConfig {
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }

    pub fn idle_period(&self) -> Duration {
        Duration::from_millis(self.idle_period_ms)
    }
}

/// Signed gain multipliers for one command family, one pair per direction.
///
/// Separate forward/reverse pairs exist because real drivetrains have
/// asymmetric slack between forward and reverse motion; a single signed
/// multiplier is not enough for sub-degree accuracy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WheelMultipliers {
    pub left_forward: f64,
    pub right_forward: f64,
    pub left_reverse: f64,
    pub right_reverse: f64,
}

impl WheelMultipliers {
    /// Pick the pair for a command of the given sign.
    pub fn select(&self, positive: bool) -> (f64, f64) {
        if positive {
            (self.left_forward, self.right_forward)
        } else {
            (self.left_reverse, self.right_reverse)
        }
    }
}

/// Geometry and calibration for the dual-wheel driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Distance from either wheel to the center point between them, in cm.
    pub track_radius_cm: f64,
    pub straight_ticks_per_cm: f64,
    pub turning_ticks_per_cm: f64,
    pub straight: WheelMultipliers,
    pub turning: WheelMultipliers,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            track_radius_cm: 11.5,
            straight_ticks_per_cm: 23.0,
            turning_ticks_per_cm: 23.0,
            straight: WheelMultipliers {
                left_forward: 1.0,
                right_forward: 1.0,
                left_reverse: -1.0,
                right_reverse: -1.0,
            },
            // Positive angle is counter-clockwise: left wheel backward,
            // right wheel forward.
            turning: WheelMultipliers {
                left_forward: -1.0,
                right_forward: 1.0,
                left_reverse: 1.0,
                right_reverse: -1.0,
            },
        }
    }
}

/// Tuning for the motion sequencer worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Settling pause between consecutive commands and after the last one,
    /// in milliseconds.
    pub settle_timeout_ms: u64,
    /// Completion poll interval, in milliseconds.
    pub poll_period_ms: u64,
    /// Wheel speed used for commands, in ticks/s.
    pub default_speed: i32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            settle_timeout_ms: 1000,
            poll_period_ms: 2,
            default_speed: 500,
        }
    }
}

impl SequencerConfig {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }
}

/// Everything one robot needs, loadable from a single JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub ramp: RampConfig,
    pub drive: DriveConfig,
    pub sequencer: SequencerConfig,
}

impl RobotConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = RobotConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RobotConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ramp.min_speed, config.ramp.min_speed);
        assert_eq!(back.drive.track_radius_cm, config.drive.track_radius_cm);
        assert_eq!(
            back.sequencer.settle_timeout_ms,
            config.sequencer.settle_timeout_ms
        );
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: RobotConfig =
            serde_json::from_str(r#"{"drive": {"track_radius_cm": 8.15}}"#).unwrap();
        assert_eq!(config.drive.track_radius_cm, 8.15);
        assert_eq!(config.ramp.loop_period_ms, 50);
        assert_eq!(config.sequencer.default_speed, 500);
    }

    #[test]
    fn multiplier_selection_follows_sign() {
        let turning = DriveConfig::default().turning;
        assert_eq!(turning.select(true), (-1.0, 1.0));
        assert_eq!(turning.select(false), (1.0, -1.0));
    }
}
