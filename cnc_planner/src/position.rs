//! Position frames.
//!
//! Moves exist in several reference frames at once:
//!
//! - planner position: end of the last queued move; start of the next one
//!   to be planned. Written only by the producer, at queue time.
//! - runtime position: current interpolated position of the executing
//!   segment.
//! - runtime target: end of the executing segment.
//! - runtime endpoint: final target of the executing move.
//!
//! Runtime position leads the physical tool by the depth of the step
//! pipeline. Neither frame corrects the other: a reader of the other
//! context's frame sees a stale snapshot.

use cnc_common::consts::{AXES, MOTORS, SEGMENT_TIME};
use cnc_common::planner::state::{Axis, AxisVector, MotorVector};

use crate::collab::{Kinematics, StepPrep};

/// Planner model: owned by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlannerModel {
    pub position: AxisVector,
    /// Source line stamped on the next queued slot.
    pub line: u32,
}

impl PlannerModel {
    #[inline]
    pub fn set_position(&mut self, axis: Axis, value: f32) {
        self.position[axis.index()] = value;
    }
}

/// Runtime model: owned by the time-critical context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeModel {
    pub position: AxisVector,
    pub target: AxisVector,
    pub endpoint: AxisVector,

    pub target_steps: MotorVector,
    pub position_steps: MotorVector,
    pub commanded_steps: MotorVector,
    pub following_error: MotorVector,

    /// Source line of the slot being executed.
    pub line: u32,
    /// A multi-invocation item is in progress.
    pub busy: bool,
    /// Nominal linear-move segment duration [s].
    pub segment_time: f32,
}

impl Default for RuntimeModel {
    fn default() -> Self {
        Self {
            position: [0.0; AXES],
            target: [0.0; AXES],
            endpoint: [0.0; AXES],
            target_steps: [0.0; MOTORS],
            position_steps: [0.0; MOTORS],
            commanded_steps: [0.0; MOTORS],
            following_error: [0.0; MOTORS],
            line: 0,
            busy: false,
            segment_time: SEGMENT_TIME,
        }
    }
}

impl RuntimeModel {
    #[inline]
    pub fn set_position(&mut self, axis: Axis, value: f32) {
        self.position[axis.index()] = value;
    }

    /// Force step counters into agreement with the runtime position.
    ///
    /// Target, position and commanded step counters all take the inverse
    /// kinematics of the runtime position; following error and the step
    /// layer's corrections are zeroed. Only valid while motion is stopped.
    pub fn sync_to_steps(&mut self, kinematics: &dyn Kinematics, steps: &mut dyn StepPrep) {
        let step_position = kinematics.inverse(&self.position);

        for motor in 0..MOTORS {
            self.target_steps[motor] = step_position[motor];
            self.position_steps[motor] = step_position[motor];
            self.commanded_steps[motor] = step_position[motor];
            steps.set_encoder_steps(motor, step_position[motor]);

            self.following_error[motor] = 0.0;
        }
        steps.reset_corrections();
    }

    /// Account for one segment handed to the step layer.
    pub(crate) fn advance_segment(&mut self, target: AxisVector, target_steps: MotorVector) {
        self.target = target;
        self.commanded_steps = self.position_steps;
        self.position_steps = self.target_steps;
        self.target_steps = target_steps;
        self.position = target;
    }
}
