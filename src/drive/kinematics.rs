// Command-to-tick conversion for a differential drive
//
// A logical command (drive a distance, turn an angle) becomes one signed tick
// delta per wheel. The calibration multipliers carry both the sign of the
// motion and the per-wheel gain correction, with separate pairs for the two
// directions of each command family.

use crate::config::DriveConfig;

/// Signed relative tick targets for the two wheels of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelTicks {
    pub left: i32,
    pub right: i32,
}

/// Ticks for a straight move of `distance_cm` (signed, forward positive).
pub fn straight_ticks(config: &DriveConfig, distance_cm: f64) -> WheelTicks {
    let ticks = distance_cm.abs() * config.straight_ticks_per_cm;
    let (left, right) = config.straight.select(distance_cm >= 0.0);
    WheelTicks {
        left: (ticks * left).round() as i32,
        right: (ticks * right).round() as i32,
    }
}

/// Ticks for an on-the-spot turn by `angle_rad` (signed, counter-clockwise
/// positive). The arc length at the wheel track gives the distance each
/// wheel covers; the multipliers make the wheels counter-rotate.
pub fn turn_ticks(config: &DriveConfig, angle_rad: f64) -> WheelTicks {
    let distance = angle_rad * config.track_radius_cm;
    let ticks = distance.abs() * config.turning_ticks_per_cm;
    let (left, right) = config.turning.select(angle_rad >= 0.0);
    WheelTicks {
        left: (ticks * left).round() as i32,
        right: (ticks * right).round() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn config() -> DriveConfig {
        DriveConfig::default()
    }

    #[test]
    fn straight_ticks_scale_with_distance() {
        // default calibration: 23 ticks/cm, unity multipliers
        let ticks = straight_ticks(&config(), 10.0);
        assert_eq!(ticks, WheelTicks { left: 230, right: 230 });
    }

    #[test]
    fn reverse_uses_the_negative_multiplier_pair() {
        let ticks = straight_ticks(&config(), -10.0);
        assert_eq!(ticks, WheelTicks { left: -230, right: -230 });
    }

    #[test]
    fn drive_round_trip_nets_zero_ticks() {
        for d in [4.0, 10.0, 33.3, 128.7] {
            let out = straight_ticks(&config(), d);
            let back = straight_ticks(&config(), -d);
            assert_eq!(out.left + back.left, 0, "distance {d}");
            assert_eq!(out.right + back.right, 0, "distance {d}");
        }
    }

    #[test]
    fn quarter_turn_tick_magnitude() {
        // track radius 8.15, 10 ticks/cm: a quarter turn covers
        // (pi/2 * 8.15) cm of arc at each wheel.
        let config = DriveConfig {
            track_radius_cm: 8.15,
            turning_ticks_per_cm: 10.0,
            ..DriveConfig::default()
        };
        let expected = (FRAC_PI_2 * 8.15 * 10.0).round() as i32;
        let ticks = turn_ticks(&config, FRAC_PI_2);
        assert_eq!(ticks.left.abs(), expected);
        assert_eq!(ticks.right.abs(), expected);
        // counter-rotation, CCW: left backward, right forward
        assert_eq!(ticks.left, -expected);
        assert_eq!(ticks.right, expected);
    }

    #[test]
    fn turn_direction_flips_with_the_angle_sign() {
        let ccw = turn_ticks(&config(), PI);
        let cw = turn_ticks(&config(), -PI);
        assert!(ccw.left < 0 && ccw.right > 0);
        assert!(cw.left > 0 && cw.right < 0);
    }

    #[test]
    fn gain_multipliers_skew_one_wheel() {
        let mut config = config();
        config.straight.left_forward = 1.02;
        let ticks = straight_ticks(&config, 100.0);
        assert_eq!(ticks.left, (2300.0 * 1.02_f64).round() as i32);
        assert_eq!(ticks.right, 2300);
    }
}
