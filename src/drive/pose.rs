// Dead-reckoned pose
//
// The stored heading is unbounded and accumulates across rotations;
// normalization happens only when comparing, never on the stored value.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// 2D position plus heading in radians, counter-clockwise positive,
/// zero along +x.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    /// Accumulate a completed rotation.
    pub fn rotate(&mut self, angle_rad: f64) {
        self.heading += angle_rad;
    }

    /// Accumulate a completed straight motion: the signed distance as a
    /// polar vector at the current heading.
    pub fn advance(&mut self, distance: f64) {
        self.x += distance * self.heading.cos();
        self.y += distance * self.heading.sin();
    }

    /// Heading folded into `[0, 2*pi)` for comparisons. Does not mutate.
    pub fn normalized_heading(&self) -> f64 {
        self.heading.rem_euclid(TAU)
    }

    /// Signed shortest rotation from the current heading to `target`,
    /// in `(-pi, pi]`.
    pub fn shortest_angle_to(&self, target: f64) -> f64 {
        let diff = (target - self.heading).rem_euclid(TAU);
        if diff > PI { diff - TAU } else { diff }
    }
}
