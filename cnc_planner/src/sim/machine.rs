//! Simulated canonical machine.
//!
//! Clones share one state block, so the producer thread and the cycle thread
//! can each hold a `SimMachine` and observe each other's signals. Scalar
//! state lives in atomics; the command log sits behind a `parking_lot`
//! mutex and is only locked briefly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::error::PlannerError;
use cnc_common::planner::state::{AxisFlags, AxisVector, MotionState, RunState};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::collab::MachineControl;

/// Commands kept in the log; later ones are counted only.
pub const COMMAND_LOG_CAPACITY: usize = 64;

/// One executed machine command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandRecord {
    pub command: MachineCommand,
    pub values: AxisVector,
    pub flags: AxisFlags,
}

#[derive(Debug, Default)]
struct Shared {
    run_state: AtomicU8,
    motion_state: AtomicU8,
    cycle_ends: AtomicU32,
    arc_aborts: AtomicU32,
    commands_executed: AtomicU32,
    alarm: Mutex<Option<PlannerError>>,
    commands: Mutex<heapless::Vec<CommandRecord, COMMAND_LOG_CAPACITY>>,
}

/// Shared-state machine stand-in.
#[derive(Debug, Clone, Default)]
pub struct SimMachine {
    shared: Arc<Shared>,
}

impl SimMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_run_state(&self, state: RunState) {
        self.shared.run_state.store(state as u8, Ordering::Release);
    }

    pub fn motion_state(&self) -> MotionState {
        match self.shared.motion_state.load(Ordering::Acquire) {
            1 => MotionState::Run,
            2 => MotionState::Hold,
            _ => MotionState::Stop,
        }
    }

    /// Number of cycle-end signals received.
    pub fn cycle_ends(&self) -> u32 {
        self.shared.cycle_ends.load(Ordering::Acquire)
    }

    pub fn arc_aborts(&self) -> u32 {
        self.shared.arc_aborts.load(Ordering::Acquire)
    }

    pub fn commands_executed(&self) -> u32 {
        self.shared.commands_executed.load(Ordering::Acquire)
    }

    /// First hard alarm raised, if any.
    pub fn alarm(&self) -> Option<PlannerError> {
        *self.shared.alarm.lock()
    }

    /// Snapshot of the command log.
    pub fn commands(&self) -> heapless::Vec<CommandRecord, COMMAND_LOG_CAPACITY> {
        self.shared.commands.lock().clone()
    }
}

impl MachineControl for SimMachine {
    fn run_state(&self) -> RunState {
        RunState::from_u8(self.shared.run_state.load(Ordering::Acquire)).unwrap_or_default()
    }

    fn set_motion_state(&mut self, state: MotionState) {
        self.shared.motion_state.store(state as u8, Ordering::Release);
    }

    fn cycle_end(&mut self) {
        self.shared.cycle_ends.fetch_add(1, Ordering::AcqRel);
    }

    fn hard_alarm(&mut self, err: PlannerError) {
        error!("Hard alarm: {err}");
        let mut alarm = self.shared.alarm.lock();
        if alarm.is_none() {
            *alarm = Some(err);
        }
        drop(alarm);
        self.set_run_state(RunState::Estopped);
    }

    fn abort_arc(&mut self) {
        self.shared.arc_aborts.fetch_add(1, Ordering::AcqRel);
    }

    fn exec_command(&mut self, command: MachineCommand, values: &AxisVector, flags: AxisFlags) {
        self.shared.commands_executed.fetch_add(1, Ordering::AcqRel);
        let _ = self.shared.commands.lock().push(CommandRecord {
            command,
            values: *values,
            flags,
        });
        if command.is_program_flow() {
            info!(?command, "Program flow command reached");
        }
    }
}
