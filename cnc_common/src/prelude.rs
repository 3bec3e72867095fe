//! Prelude module for common re-exports.
//!
//! ```rust
//! use cnc_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AXES, MOTORS, PLANNER_BUFFER_POOL_SIZE};

// ─── Planner Types ──────────────────────────────────────────────────
pub use crate::planner::command::MachineCommand;
pub use crate::planner::error::PlannerError;
pub use crate::planner::state::{
    Axis, AxisFlags, AxisVector, MotionState, MotorVector, RunState,
};
