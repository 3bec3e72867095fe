//! Simulated collaborators.
//!
//! Software stand-ins for the step layer and the canonical machine, used by
//! the `cnc_planner` binary and by tests to drive the planner without
//! hardware.

mod machine;
mod steps;

pub use machine::{CommandRecord, SimMachine};
pub use steps::{PreparedSegment, SimSteps};
