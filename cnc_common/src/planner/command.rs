//! Synchronous machine commands carried through the planner queue.
//!
//! A `MachineCommand` names the canonical-machine action to run when the
//! queue reaches the point its originating Gcode block occupied. The action
//! receives the value and flag vectors stored alongside it in the slot.

use serde::{Deserialize, Serialize};

/// Canonical-machine action executed in step with the motion stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineCommand {
    /// M0: program stop.
    ProgramStop,
    /// M1: optional program stop.
    OptionalStop,
    /// M2 / M30: program end.
    ProgramEnd,
    /// M3 / M4 / M5: spindle control. Direction in `values[0]` (+1, -1, 0).
    SpindleControl,
    /// S word: spindle speed in `values[0]`.
    SpindleSpeed,
    /// M7 / M8 / M9: coolant. Mist in `values[0]`, flood in `values[1]`.
    Coolant,
    /// M50: feed rate override factor in `values[0]`.
    FeedOverride,
    /// M50.1: traverse override factor in `values[0]`.
    TraverseOverride,
    /// G28.3: set absolute origin for the flagged axes.
    SetOrigin,
    /// Any other M code, by number.
    Custom(u16),
}

impl MachineCommand {
    /// Map an M code number to its command.
    pub const fn from_mcode(code: u16) -> Self {
        match code {
            0 => Self::ProgramStop,
            1 => Self::OptionalStop,
            2 | 30 => Self::ProgramEnd,
            3..=5 => Self::SpindleControl,
            7..=9 => Self::Coolant,
            50 => Self::FeedOverride,
            other => Self::Custom(other),
        }
    }

    /// Whether this command ends or pauses program execution.
    #[inline]
    pub const fn is_program_flow(&self) -> bool {
        matches!(self, Self::ProgramStop | Self::OptionalStop | Self::ProgramEnd)
    }
}
