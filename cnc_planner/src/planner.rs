//! Planner context and its producer/consumer halves.
//!
//! [`Planner`] owns the buffer pool and both position frames for the life of
//! the process. [`Planner::split`] hands out one [`Producer`] (interpreter
//! context) and one [`Consumer`] (time-critical context). Each half can only
//! reach the state its context is allowed to write, so the cross-context
//! discipline is enforced by the borrow checker rather than by runtime
//! checks.
//!
//! Population of a slot goes through [`WriteBuffer`]: committing consumes
//! the handle, so a slot cannot be touched after it is handed to the
//! consumer. Dropping an uncommitted handle returns the slot to the pool.

use cnc_common::consts::PLANNER_BUFFER_POOL_SIZE;
use cnc_common::planner::config::PlannerConfig;
use cnc_common::planner::state::{Axis, AxisVector, MotionState};
use tracing::{debug, info};

use crate::collab::{Kinematics, MachineControl, StepPrep};
use crate::pool::MovePool;
use crate::position::{PlannerModel, RuntimeModel};
use crate::slot::{SlotBody, SlotId, WorkItem};

/// Process-wide planner state.
pub struct Planner<const N: usize = PLANNER_BUFFER_POOL_SIZE> {
    pool: MovePool<N>,
    planner: PlannerModel,
    runtime: RuntimeModel,
}

impl<const N: usize> Default for Planner<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Planner<N> {
    /// Zero-initialized pool and position frames.
    pub fn new() -> Self {
        Self {
            pool: MovePool::new(),
            planner: PlannerModel::default(),
            runtime: RuntimeModel::default(),
        }
    }

    /// Zero-initialized planner using the configured segment duration.
    pub fn with_config(config: &PlannerConfig) -> Self {
        let mut planner = Self::new();
        planner.runtime.segment_time = config.segment_time;
        info!(
            "Planner initialized: {} buffers, segment_time={}s",
            N, config.segment_time
        );
        planner
    }

    /// Split into the producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        (
            Producer {
                pool: &self.pool,
                model: &mut self.planner,
            },
            Consumer {
                pool: &self.pool,
                runtime: &mut self.runtime,
            },
        )
    }

    /// Abandon every queued and running item and reset to stopped.
    ///
    /// Aborts any arc in progress, re-initializes the pool and reports
    /// `MotionState::Stop`. Position frames are not touched. Call during a
    /// hold; the consumer must not be mid-step.
    pub fn flush(&mut self, machine: &mut dyn MachineControl) {
        let dropped = N - self.pool.buffers_available();
        machine.abort_arc();
        self.pool.reset();
        self.runtime.busy = false;
        machine.set_motion_state(MotionState::Stop);
        info!("Planner flushed ({dropped} buffers dropped)");
    }

    #[inline]
    pub fn buffers_available(&self) -> usize {
        self.pool.buffers_available()
    }

    pub fn pool(&self) -> &MovePool<N> {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut MovePool<N> {
        &mut self.pool
    }

    pub fn planner_model(&self) -> &PlannerModel {
        &self.planner
    }

    pub fn runtime_model(&self) -> &RuntimeModel {
        &self.runtime
    }
}

// ─── Producer ───────────────────────────────────────────────────────

/// Producer half: claims, populates and commits slots; owns the planner
/// position.
pub struct Producer<'a, const N: usize> {
    pool: &'a MovePool<N>,
    model: &'a mut PlannerModel,
}

impl<'a, const N: usize> Producer<'a, N> {
    #[inline]
    pub fn buffers_available(&self) -> usize {
        self.pool.buffers_available()
    }

    /// Claim the next slot for population.
    ///
    /// `None` means the pool is exhausted. Callers are expected to have
    /// checked [`buffers_available`](Self::buffers_available) first and must
    /// treat `None` as fatal.
    pub fn get_write_buffer(&mut self) -> Option<WriteBuffer<'_, N>> {
        // SAFETY: `Producer` is the only producer-context handle to the pool.
        let id = unsafe { self.pool.get_write_buffer() }?;
        Some(WriteBuffer {
            pool: self.pool,
            id,
            armed: true,
        })
    }

    pub fn set_planner_position(&mut self, axis: Axis, value: f32) {
        self.model.set_position(axis, value);
    }

    #[inline]
    pub fn planner_position(&self) -> &AxisVector {
        &self.model.position
    }

    /// Read-only view of the shared pool.
    pub fn pool(&self) -> &MovePool<N> {
        self.pool
    }

    pub(crate) fn model_mut(&mut self) -> &mut PlannerModel {
        self.model
    }
}

/// A claimed, uncommitted slot.
pub struct WriteBuffer<'p, const N: usize> {
    pool: &'p MovePool<N>,
    id: SlotId,
    armed: bool,
}

impl<const N: usize> WriteBuffer<'_, N> {
    #[inline]
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Record the source line number of the originating block.
    pub fn set_line(&mut self, line: u32) {
        // SAFETY: the handle exists only while the slot is LOADING and it
        // borrows the producer exclusively.
        unsafe { self.pool.loading_body(self.id) }.line = line;
    }

    pub fn body(&self) -> SlotBody {
        // SAFETY: as above; the copy ends the borrow immediately.
        unsafe { *self.pool.loading_body(self.id) }
    }

    /// Stamp the work item and queue the slot for execution.
    ///
    /// The consumer may run and recycle the slot before this returns.
    pub fn commit(mut self, item: WorkItem) {
        self.armed = false;
        debug_assert_eq!(self.pool.cursors().queue, self.id);
        debug!(slot = self.id.index(), kind = ?item.move_type(), "commit");
        // SAFETY: the slot is LOADING and sits at the queue cursor.
        unsafe { self.pool.commit_write_buffer(item) };
    }

    /// Abandon population and return the slot to the pool.
    pub fn unget(self) {}
}

impl<const N: usize> Drop for WriteBuffer<'_, N> {
    fn drop(&mut self) {
        if self.armed {
            // SAFETY: the slot was claimed by this handle and never committed;
            // it is the most recent claim because the handle borrows the
            // producer exclusively.
            unsafe { self.pool.unget_write_buffer() };
        }
    }
}

// ─── Consumer ───────────────────────────────────────────────────────

/// Consumer half: runs and frees committed slots; owns the runtime model.
pub struct Consumer<'a, const N: usize> {
    pool: &'a MovePool<N>,
    runtime: &'a mut RuntimeModel,
}

impl<'a, const N: usize> Consumer<'a, N> {
    #[inline]
    pub fn buffers_available(&self) -> usize {
        self.pool.buffers_available()
    }

    /// Current run slot, promoting a QUEUED/PENDING slot to RUNNING.
    /// Returns the same slot until it is freed.
    pub fn get_run_buffer(&mut self) -> Option<SlotId> {
        // SAFETY: `Consumer` is the only consumer-context handle to the pool.
        unsafe { self.pool.get_run_buffer() }
    }

    /// Release the RUNNING slot. `Some(true)` if the queue is now empty,
    /// `None` if no slot was running (nothing is freed).
    pub fn free_run_buffer(&mut self) -> Option<bool> {
        // SAFETY: consumer context; no body borrow outlives `&mut self`.
        unsafe { self.pool.free_run_buffer() }
    }

    /// The running slot.
    pub fn get_first_buffer(&mut self) -> Option<SlotId> {
        self.get_run_buffer()
    }

    /// The newest committed slot, walking forward from the running slot.
    pub fn get_last_buffer(&mut self) -> Option<SlotId> {
        let first = self.get_run_buffer()?;
        let mut last = first;
        loop {
            let next = self.pool.links(last).nx;
            if next == first || !self.pool.state(next).is_committed() {
                return Some(last);
            }
            last = next;
        }
    }

    /// Whether the run slot holds committed work.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.pool.state(self.pool.run_cursor()).is_committed()
    }

    /// Consume the signal raised by the last commit.
    #[inline]
    pub fn take_exec_request(&self) -> bool {
        self.pool.take_exec_request()
    }

    pub fn set_runtime_position(&mut self, axis: Axis, value: f32) {
        self.runtime.set_position(axis, value);
    }

    #[inline]
    pub fn runtime(&self) -> &RuntimeModel {
        self.runtime
    }

    /// Read-only view of the shared pool.
    pub fn pool(&self) -> &MovePool<N> {
        self.pool
    }

    /// Force step counters to agree with the runtime position.
    /// Only while motion is stopped.
    pub fn sync_runtime_to_steps(&mut self, kinematics: &dyn Kinematics, steps: &mut dyn StepPrep) {
        debug_assert!(!self.runtime.busy, "step sync while a move is in flight");
        self.runtime.sync_to_steps(kinematics, steps);
    }

    /// Body of the RUNNING slot.
    pub(crate) fn body(&mut self, id: SlotId) -> &mut SlotBody {
        // SAFETY: consumer context; the returned borrow is tied to
        // `&mut self`, so it ends before any free.
        unsafe { self.pool.running_body(id) }
    }

    pub(crate) fn runtime_mut(&mut self) -> &mut RuntimeModel {
        self.runtime
    }
}
