//! Move slot contents.
//!
//! A slot is split into two parts that never mix:
//!
//! - [`Links`]: ring neighbours, fixed when the pool is built.
//! - [`SlotBody`]: everything a work item writes. Clearing or copying a
//!   slot only ever touches the body.
//!
//! The work item is a tagged variant; the execution engine dispatches on it
//! with a `match` instead of calling a stored function pointer.

use cnc_common::consts::{AXES, EPSILON};
use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::state::{AxisFlags, AxisVector};

/// Index of a slot in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) u8);

impl SlotId {
    /// Position of the slot in the ring.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ring neighbours of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Links {
    pub nx: SlotId,
    pub pv: SlotId,
}

/// Work item tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MoveType {
    #[default]
    None = 0,
    Move = 1,
    Dwell = 2,
    Command = 3,
}

/// Lifecycle of a slot's work while its buffer state is RUNNING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MoveState {
    /// Not populated.
    #[default]
    Off = 0,
    /// Committed, not yet started.
    New = 1,
    /// Started; later invocations continue it.
    Running = 2,
}

/// Payload of a queued machine command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandItem {
    pub command: MachineCommand,
    pub values: AxisVector,
    pub flags: AxisFlags,
}

/// Payload of a queued dwell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DwellItem {
    /// Duration in seconds.
    pub seconds: f32,
}

impl DwellItem {
    /// Duration in the step layer's unit (µs), truncated.
    #[inline]
    pub fn microseconds(&self) -> u32 {
        (self.seconds * cnc_common::consts::MICROSECONDS_PER_SECOND) as u32
    }
}

/// Progress of a segmented linear move. Lives in the slot so every
/// re-entry resumes from slot-local state only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineProgress {
    /// Runtime position when the move started.
    pub start: AxisVector,
    /// Total segments.
    pub segments: u32,
    /// Segments already handed to the step layer.
    pub emitted: u32,
    /// Duration of each segment [s].
    pub segment_time: f32,
}

/// Payload of a queued constant-velocity linear move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineItem {
    /// Final target position.
    pub target: AxisVector,
    /// Total move duration [s].
    pub move_time: f32,
    pub progress: LineProgress,
}

impl LineItem {
    pub fn new(target: AxisVector, move_time: f32) -> Self {
        Self {
            target,
            move_time,
            progress: LineProgress::default(),
        }
    }

    /// Euclidean distance from `from` to the target.
    pub fn length_from(&self, from: &AxisVector) -> f32 {
        (0..AXES)
            .map(|axis| {
                let d = self.target[axis] - from[axis];
                d * d
            })
            .sum::<f32>()
            .sqrt()
    }

    /// True if the move has no length to cover from `from`.
    #[inline]
    pub fn is_zero_length(&self, from: &AxisVector) -> bool {
        self.length_from(from) < EPSILON
    }

    /// Interpolated target of segment `n` (1-based). The last segment lands
    /// exactly on the target.
    pub fn segment_target(&self, n: u32) -> AxisVector {
        let p = &self.progress;
        if n >= p.segments {
            return self.target;
        }
        let fraction = n as f32 / p.segments as f32;
        core::array::from_fn(|axis| p.start[axis] + (self.target[axis] - p.start[axis]) * fraction)
    }
}

/// One unit of queued work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkItem {
    Move(LineItem),
    Dwell(DwellItem),
    Command(CommandItem),
}

impl WorkItem {
    #[inline]
    pub const fn move_type(&self) -> MoveType {
        match self {
            Self::Move(_) => MoveType::Move,
            Self::Dwell(_) => MoveType::Dwell,
            Self::Command(_) => MoveType::Command,
        }
    }
}

/// Everything in a slot except its ring links.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlotBody {
    pub move_state: MoveState,
    /// Source line number of the originating block.
    pub line: u32,
    pub work: Option<WorkItem>,
}

impl SlotBody {
    /// Tag of the stored work item.
    #[inline]
    pub fn move_type(&self) -> MoveType {
        self.work.map_or(MoveType::None, |w| w.move_type())
    }

    /// Wipe the payload.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
