//! Planner error taxonomy.
//!
//! Capacity exhaustion is the only failure the pool itself can produce; the
//! remaining variants come from the execution dispatcher. Fatal errors are
//! raised as a hard alarm to the canonical machine, never retried.

use thiserror::Error;

/// Errors surfaced by the planner to its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlannerError {
    /// No write buffer available. **FATAL → hard alarm**.
    #[error("planner buffer pool exhausted")]
    BufferFull,

    /// Execution requested while the machine is e-stopped.
    #[error("machine is alarmed")]
    MachineAlarmed,

    /// A running slot is in an impossible state. **FATAL → hard alarm**.
    #[error("internal planner error: {0}")]
    InternalError(&'static str),
}

impl PlannerError {
    /// Whether this error must halt the machine with a hard alarm.
    #[inline]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::BufferFull | Self::InternalError(_))
    }
}
