//! Producer-side queueing of work items.
//!
//! Each operation claims a write buffer, stamps one work item and commits
//! it. Running out of buffers is fatal: the machine is hard-alarmed and the
//! error is returned, never retried.

use cnc_common::planner::command::MachineCommand;
use cnc_common::planner::error::PlannerError;
use cnc_common::planner::state::{AxisFlags, AxisVector};
use tracing::{debug, error, warn};

use crate::collab::MachineControl;
use crate::planner::{Producer, WriteBuffer};
use crate::slot::{CommandItem, DwellItem, LineItem, WorkItem};

impl<const N: usize> Producer<'_, N> {
    /// Queue a synchronous machine command, run in order with motion.
    pub fn queue_command(
        &mut self,
        machine: &mut dyn MachineControl,
        command: MachineCommand,
        values: &AxisVector,
        flags: AxisFlags,
    ) -> Result<(), PlannerError> {
        let buffer = self.claim(machine)?;
        buffer.commit(WorkItem::Command(CommandItem {
            command,
            values: *values,
            flags,
        }));
        debug!(?command, ?flags, "Queued command");
        Ok(())
    }

    /// Queue a timed pause.
    pub fn dwell(&mut self, machine: &mut dyn MachineControl, seconds: f32) -> Result<(), PlannerError> {
        let buffer = self.claim(machine)?;
        buffer.commit(WorkItem::Dwell(DwellItem { seconds }));
        debug!(seconds, "Queued dwell");
        Ok(())
    }

    /// Queue a constant-velocity move from the planner position to `target`
    /// lasting `move_time` seconds. The planner position becomes `target`.
    ///
    /// `move_time` must be finite and non-negative. Anything else is queued
    /// as a zero-time move, which executes as a single nominal segment.
    pub fn queue_line(
        &mut self,
        machine: &mut dyn MachineControl,
        target: &AxisVector,
        move_time: f32,
        line: u32,
    ) -> Result<(), PlannerError> {
        let move_time = if move_time.is_finite() && move_time >= 0.0 {
            move_time
        } else {
            warn!(line, move_time, "Invalid move time, queued as zero");
            0.0
        };
        self.model_mut().line = line;
        let buffer = self.claim(machine)?;
        buffer.commit(WorkItem::Move(LineItem::new(*target, move_time)));
        self.model_mut().position = *target;
        debug!(line, move_time, ?target, "Queued line");
        Ok(())
    }

    /// Source line stamped on subsequently queued commands and dwells.
    pub fn set_line(&mut self, line: u32) {
        self.model_mut().line = line;
    }

    fn claim(&mut self, machine: &mut dyn MachineControl) -> Result<WriteBuffer<'_, N>, PlannerError> {
        let line = self.model_mut().line;
        match self.get_write_buffer() {
            Some(mut buffer) => {
                buffer.set_line(line);
                Ok(buffer)
            }
            None => {
                error!(line, "Planner buffer pool exhausted");
                machine.hard_alarm(PlannerError::BufferFull);
                Err(PlannerError::BufferFull)
            }
        }
    }
}
