//! Continuation execution engine.
//!
//! [`Consumer::exec_move`] is called once per time-critical tick. It finds
//! the RUNNING slot and advances its work item by one bounded step. A work
//! item that needs more than one tick returns [`ExecStatus::Continue`] and
//! keeps all of its progress in the slot, so the next call resumes from
//! slot-local state only.
//!
//! Every item that frees its slot checks whether the queue drained and, if
//! so, signals cycle-end exactly once.

use cnc_common::planner::error::PlannerError;
use cnc_common::planner::state::{MotionState, RunState};
use tracing::trace;

use crate::collab::{Kinematics, MachineControl, StepPrep};
use crate::planner::Consumer;
use crate::slot::{CommandItem, DwellItem, LineItem, LineProgress, MoveState, SlotId, WorkItem};

/// Result of one execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecStatus {
    /// Nothing ran: queue empty, machine holding, or the item was a no-op.
    Noop,
    /// The running item needs further invocations.
    Continue,
    /// The running item finished and its slot was freed.
    Done,
}

/// Collaborators reached by the engine during one step.
pub struct ExecContext<'c> {
    pub steps: &'c mut dyn StepPrep,
    pub kinematics: &'c dyn Kinematics,
    pub machine: &'c mut dyn MachineControl,
}

impl<const N: usize> Consumer<'_, N> {
    /// Advance the running work item by one step.
    ///
    /// # Errors
    /// - [`PlannerError::MachineAlarmed`] if the machine is e-stopped.
    /// - [`PlannerError::InternalError`] if the running slot holds no work
    ///   item; a hard alarm has already been raised.
    pub fn exec_move(&mut self, ctx: &mut ExecContext<'_>) -> Result<ExecStatus, PlannerError> {
        match ctx.machine.run_state() {
            RunState::Estopped => return Err(PlannerError::MachineAlarmed),
            RunState::Holding => return Ok(ExecStatus::Noop),
            _ => {}
        }

        let Some(id) = self.get_run_buffer() else {
            return Ok(ExecStatus::Noop);
        };
        let body = *self.body(id);
        self.runtime_mut().line = body.line;

        match body.work {
            Some(WorkItem::Command(item)) => Ok(self.exec_command(ctx, &item)),
            Some(WorkItem::Dwell(item)) => Ok(self.exec_dwell(ctx, id, body.move_state, item)),
            Some(WorkItem::Move(item)) => Ok(self.exec_line(ctx, id, body.move_state, item)),
            None => {
                let err = PlannerError::InternalError("running slot holds no work item");
                ctx.machine.hard_alarm(err);
                Err(err)
            }
        }
    }

    fn exec_command(&mut self, ctx: &mut ExecContext<'_>, item: &CommandItem) -> ExecStatus {
        trace!(command = ?item.command, "exec command");
        ctx.machine.exec_command(item.command, &item.values, item.flags);
        self.finish(ctx);
        ExecStatus::Done
    }

    /// The slot stays RUNNING until the step layer reports `dwell_complete()`.
    fn exec_dwell(
        &mut self,
        ctx: &mut ExecContext<'_>,
        id: SlotId,
        state: MoveState,
        item: DwellItem,
    ) -> ExecStatus {
        if state == MoveState::New {
            let us = item.microseconds();
            trace!(us, "dwell start");
            ctx.steps.prep_dwell(us);
            self.body(id).move_state = MoveState::Running;
            self.runtime_mut().busy = true;
            return ExecStatus::Continue;
        }

        if !ctx.steps.dwell_complete() {
            return ExecStatus::Continue;
        }
        self.finish(ctx);
        ExecStatus::Done
    }

    fn exec_line(
        &mut self,
        ctx: &mut ExecContext<'_>,
        id: SlotId,
        state: MoveState,
        mut item: LineItem,
    ) -> ExecStatus {
        if state == MoveState::New {
            let start = self.runtime().position;
            if item.is_zero_length(&start) {
                trace!("zero-length move dropped");
                self.finish(ctx);
                return ExecStatus::Noop;
            }

            let nominal = self.runtime().segment_time;
            let segments = ((item.move_time / nominal).ceil() as u32).max(1);
            let segment_time = if item.move_time > 0.0 {
                item.move_time / segments as f32
            } else {
                nominal
            };
            item.progress = LineProgress {
                start,
                segments,
                emitted: 0,
                segment_time,
            };

            let runtime = self.runtime_mut();
            runtime.endpoint = item.target;
            runtime.busy = true;
            ctx.machine.set_motion_state(MotionState::Run);
            trace!(segments, "move start");
        }

        if ctx.steps.ready() {
            let n = item.progress.emitted + 1;
            let target = item.segment_target(n);
            let target_steps = ctx.kinematics.inverse(&target);
            ctx.steps.prep_line(&target_steps, item.progress.segment_time);
            self.runtime_mut().advance_segment(target, target_steps);
            item.progress.emitted = n;

            if n >= item.progress.segments {
                self.finish(ctx);
                return ExecStatus::Done;
            }
        }

        let body = self.body(id);
        body.work = Some(WorkItem::Move(item));
        body.move_state = MoveState::Running;
        ExecStatus::Continue
    }

    /// Free the run slot; cycle-end if that drained the queue.
    fn finish(&mut self, ctx: &mut ExecContext<'_>) {
        self.runtime_mut().busy = false;
        if self.free_run_buffer() == Some(true) {
            trace!("queue drained");
            ctx.machine.cycle_end();
        }
    }
}
