//! Cartesian inverse kinematics.

use cnc_common::planner::config::KinematicsConfig;
use cnc_common::planner::state::{AxisVector, MotorVector};

use crate::collab::Kinematics;

/// Motor `m` follows axis `m` at one step per unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityKinematics;

impl Kinematics for IdentityKinematics {
    fn inverse(&self, position: &AxisVector) -> MotorVector {
        core::array::from_fn(|motor| position[motor])
    }
}

/// Each motor drives one axis with its own steps-per-unit scale.
#[derive(Debug, Clone, Copy)]
pub struct CartesianKinematics {
    steps_per_unit: MotorVector,
    motor_map: [usize; cnc_common::consts::MOTORS],
}

impl CartesianKinematics {
    /// Build from a validated `[kinematics]` section.
    pub fn from_config(config: &KinematicsConfig) -> Self {
        Self {
            steps_per_unit: config.steps_per_unit,
            motor_map: core::array::from_fn(|motor| config.motor_map[motor] as usize),
        }
    }
}

impl Kinematics for CartesianKinematics {
    fn inverse(&self, position: &AxisVector) -> MotorVector {
        core::array::from_fn(|motor| position[self.motor_map[motor]] * self.steps_per_unit[motor])
    }
}
