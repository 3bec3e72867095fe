//! Configuration sections for the planner and its kinematics.
//!
//! Numeric parameters carry const `MIN`/`MAX` bounds checked by `validate()`.
//! Every field has a serde default so an empty section is valid.

use serde::{Deserialize, Serialize};

use crate::consts::{
    AXES, CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, MOTORS, SEGMENT_TIME,
    SEGMENT_TIME_MAX, SEGMENT_TIME_MIN,
};

/// `[planner]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Consumer (time-critical) cycle period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Nominal duration of one linear-move segment [s].
    #[serde(default = "default_segment_time")]
    pub segment_time: f32,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}
fn default_segment_time() -> f32 {
    SEGMENT_TIME
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: CYCLE_TIME_US,
            segment_time: SEGMENT_TIME,
        }
    }
}

impl PlannerConfig {
    /// Check parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(CYCLE_TIME_US_MIN..=CYCLE_TIME_US_MAX).contains(&self.cycle_time_us) {
            return Err(format!(
                "cycle_time_us {} outside [{CYCLE_TIME_US_MIN}, {CYCLE_TIME_US_MAX}]",
                self.cycle_time_us
            ));
        }
        if !(SEGMENT_TIME_MIN..=SEGMENT_TIME_MAX).contains(&self.segment_time) {
            return Err(format!(
                "segment_time {} outside [{SEGMENT_TIME_MIN}, {SEGMENT_TIME_MAX}]",
                self.segment_time
            ));
        }
        Ok(())
    }
}

/// `[kinematics]` section: cartesian axis-to-motor mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Steps per machine unit, per motor.
    #[serde(default = "default_steps_per_unit")]
    pub steps_per_unit: [f32; MOTORS],

    /// Axis index driven by each motor.
    #[serde(default = "default_motor_map")]
    pub motor_map: [u8; MOTORS],
}

fn default_steps_per_unit() -> [f32; MOTORS] {
    [1.0; MOTORS]
}
fn default_motor_map() -> [u8; MOTORS] {
    core::array::from_fn(|motor| motor as u8)
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            steps_per_unit: default_steps_per_unit(),
            motor_map: default_motor_map(),
        }
    }
}

impl KinematicsConfig {
    /// Reject non-positive scales and out-of-range axis indices.
    pub fn validate(&self) -> Result<(), String> {
        for (motor, scale) in self.steps_per_unit.iter().enumerate() {
            if !scale.is_finite() || *scale <= 0.0 {
                return Err(format!("motor {motor}: steps_per_unit must be > 0, got {scale}"));
            }
        }
        for (motor, axis) in self.motor_map.iter().enumerate() {
            if *axis as usize >= AXES {
                return Err(format!("motor {motor}: axis index {axis} >= {AXES}"));
            }
        }
        Ok(())
    }
}
