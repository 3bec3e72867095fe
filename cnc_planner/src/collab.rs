//! Collaborator interfaces.
//!
//! The planner sits between the canonical machine (above) and the step
//! layer (below). Both are reached only through these traits, so the pool
//! and execution engine can run against real drivers or the simulation in
//! [`crate::sim`].
//!
//! | Trait | Called from | RT constraint |
//! |-------|-------------|---------------|
//! | [`Kinematics`] | both contexts | bounded, no allocation |
//! | [`StepPrep`] | time-critical context | **HARD** |
//! | [`MachineControl`] | both contexts | **HARD** on the consumer side |

use cnc_common::prelude::{
    AxisFlags, AxisVector, MachineCommand, MotionState, MotorVector, PlannerError, RunState,
};

/// Inverse kinematics: machine position to motor steps.
pub trait Kinematics {
    /// Map an axis position vector to fractional per-motor step counts.
    fn inverse(&self, position: &AxisVector) -> MotorVector;
}

/// Step preparation layer fed by the execution engine.
pub trait StepPrep {
    /// Queue one constant-velocity segment ending at `target_steps`.
    fn prep_line(&mut self, target_steps: &MotorVector, segment_time: f32);

    /// Start a timed wait. The countdown is owned by the step layer.
    fn prep_dwell(&mut self, microseconds: u32);

    /// Whether the last dwell handed over with `prep_dwell` has elapsed.
    fn dwell_complete(&self) -> bool;

    /// Overwrite a motor's encoder register.
    fn set_encoder_steps(&mut self, motor: usize, steps: f32);

    /// Zero the accumulated step-correction counters of every motor.
    fn reset_corrections(&mut self);

    /// Whether the layer can accept another prepared segment.
    ///
    /// Default: always ready.
    fn ready(&self) -> bool {
        true
    }
}

/// Canonical machine services used by the planner.
pub trait MachineControl {
    /// Current machine run state.
    fn run_state(&self) -> RunState;

    fn set_motion_state(&mut self, state: MotionState);

    /// The queue drained after a run completed.
    fn cycle_end(&mut self);

    /// Halt with a fatal alarm.
    fn hard_alarm(&mut self, error: PlannerError);

    /// Abandon any arc being generated into the queue.
    fn abort_arc(&mut self);

    /// Run a queued synchronous command.
    fn exec_command(&mut self, command: MachineCommand, values: &AxisVector, flags: AxisFlags);
}
