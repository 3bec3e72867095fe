//! Axis vectors, axis flags and machine state enums.
//!
//! All enums use `#[repr(u8)]` so they can be stored in atomics and
//! exchanged between the producer and the time-critical context without
//! locking.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{AXES, MOTORS};

/// One value per machine axis, in machine units (mm or degrees).
pub type AxisVector = [f32; AXES];

/// One value per motor, in (fractional) steps.
pub type MotorVector = [f32; MOTORS];

/// Machine axis identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    A = 3,
    B = 4,
    C = 5,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; AXES] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            3 => Some(Self::A),
            4 => Some(Self::B),
            5 => Some(Self::C),
            _ => None,
        }
    }

    /// Index into an [`AxisVector`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Gcode letter for this axis.
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        }
    }

    /// Parse a Gcode axis letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|axis| axis.letter() == letter.to_ascii_uppercase())
    }
}

bitflags! {
    /// Per-axis flag vector carried by queued machine commands.
    ///
    /// A set bit means "this axis' value in the companion value vector is
    /// meaningful" (e.g. which axes an origin offset applies to).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AxisFlags: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const A = 1 << 3;
        const B = 1 << 4;
        const C = 1 << 5;
    }
}

impl AxisFlags {
    /// Flag for a single axis.
    #[inline]
    pub const fn of(axis: Axis) -> Self {
        Self::from_bits_truncate(1 << axis as u8)
    }

    /// Build a flag set from a numeric vector: any non-zero entry sets its bit.
    pub fn from_vector(values: &AxisVector) -> Self {
        Axis::ALL
            .into_iter()
            .filter(|axis| values[axis.index()] != 0.0)
            .fold(Self::empty(), |flags, axis| flags | Self::of(axis))
    }

    /// Whether the flag for `axis` is set.
    #[inline]
    pub const fn has(&self, axis: Axis) -> bool {
        self.contains(Self::of(axis))
    }
}

/// Motion state reported to the canonical machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionState {
    /// No motion queued or running.
    #[default]
    Stop = 0,
    /// Motion queued or running.
    Run = 1,
    /// Motion paused in a feedhold.
    Hold = 2,
}

/// Machine run state, owned by the canonical machine and consulted by the
/// time-critical context before each execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunState {
    /// Idle, accepting work.
    #[default]
    Ready = 0,
    /// Executing queued work.
    Running = 1,
    /// Decelerating into a hold.
    Stopping = 2,
    /// Feedhold in effect; execution is suspended.
    Holding = 3,
    /// Emergency stop; execution is refused.
    Estopped = 4,
}

impl RunState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ready),
            1 => Some(Self::Running),
            2 => Some(Self::Stopping),
            3 => Some(Self::Holding),
            4 => Some(Self::Estopped),
            _ => None,
        }
    }
}
