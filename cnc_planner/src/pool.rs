//! Fixed-capacity move buffer pool.
//!
//! `N` slots in an array-backed ring with index links and three cursors:
//!
//! - `write`: next slot to hand out for population (producer).
//! - `queue`: next slot to commit (producer).
//! - `run`  : slot currently or next executing (consumer).
//!
//! Each slot cycles `EMPTY → LOADING → QUEUED → PENDING → RUNNING → EMPTY`.
//!
//! ## Concurrency
//!
//! No lock is taken. The per-slot buffer state is the ownership token for the
//! slot body: the producer owns a body while it is `EMPTY`/`LOADING`, the
//! consumer while it is `QUEUED`/`PENDING`/`RUNNING`. Every hand-over is a
//! `Release` store of the state observed with an `Acquire` load on the other
//! side. Each cursor has exactly one writer context. The context-specific
//! operations are `unsafe` here and exposed safely through the
//! [`Producer`](crate::planner::Producer) and
//! [`Consumer`](crate::planner::Consumer) halves, of which at most one pair
//! exists per pool.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use static_assertions::const_assert;

use crate::slot::{Links, MoveState, SlotBody, SlotId, WorkItem};

const_assert!(core::mem::size_of::<SlotId>() == 1);

/// Buffer state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BufferState {
    /// Available for population.
    #[default]
    Empty = 0,
    /// Being populated by the producer.
    Loading = 1,
    /// Committed, waiting behind other work.
    Queued = 2,
    /// Committed and next in line behind the running slot.
    Pending = 3,
    /// Executing.
    Running = 4,
}

impl BufferState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Empty),
            1 => Some(Self::Loading),
            2 => Some(Self::Queued),
            3 => Some(Self::Pending),
            4 => Some(Self::Running),
            _ => None,
        }
    }

    /// Committed and owned by the consumer.
    #[inline]
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Queued | Self::Pending | Self::Running)
    }
}

struct Slot {
    links: Links,
    state: AtomicU8,
    body: UnsafeCell<SlotBody>,
}

impl Slot {
    #[inline]
    fn state(&self) -> BufferState {
        // Only BufferState discriminants are ever stored.
        BufferState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    #[inline]
    fn set_state(&self, state: BufferState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Snapshot of the three ring cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub write: SlotId,
    pub queue: SlotId,
    pub run: SlotId,
}

/// The move buffer pool. Capacity is fixed at compile time.
pub struct MovePool<const N: usize> {
    slots: [Slot; N],
    write: AtomicU8,
    queue: AtomicU8,
    run: AtomicU8,
    available: AtomicUsize,
    exec_requested: AtomicBool,
}

// SAFETY: slot bodies are only reached through `&mut self` or through the
// unsafe context operations below, whose contracts hand each body to exactly
// one context at a time via the acquire/release buffer state.
unsafe impl<const N: usize> Sync for MovePool<N> {}

impl<const N: usize> Default for MovePool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MovePool<N> {
    const VALID: () = assert!(N >= 2 && N <= u8::MAX as usize, "pool capacity must be 2..=255");

    /// Build the ring: all slots EMPTY, all cursors on slot 0.
    pub fn new() -> Self {
        let () = Self::VALID;
        Self {
            slots: core::array::from_fn(|i| Slot {
                links: Links {
                    nx: SlotId(((i + 1) % N) as u8),
                    pv: SlotId(((i + N - 1) % N) as u8),
                },
                state: AtomicU8::new(BufferState::Empty as u8),
                body: UnsafeCell::new(SlotBody::default()),
            }),
            write: AtomicU8::new(0),
            queue: AtomicU8::new(0),
            run: AtomicU8::new(0),
            available: AtomicUsize::new(N),
            exec_requested: AtomicBool::new(false),
        }
    }

    /// Return every slot to EMPTY and every cursor to slot 0. Links are kept.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot.state.get_mut() = BufferState::Empty as u8;
            slot.body.get_mut().reset();
        }
        *self.write.get_mut() = 0;
        *self.queue.get_mut() = 0;
        *self.run.get_mut() = 0;
        *self.available.get_mut() = N;
        *self.exec_requested.get_mut() = false;
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of EMPTY slots.
    #[inline]
    pub fn buffers_available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    #[inline]
    pub fn state(&self, id: SlotId) -> BufferState {
        self.slots[id.index()].state()
    }

    #[inline]
    pub fn links(&self, id: SlotId) -> Links {
        self.slots[id.index()].links
    }

    pub fn cursors(&self) -> Cursors {
        Cursors {
            write: SlotId(self.write.load(Ordering::Acquire)),
            queue: SlotId(self.queue.load(Ordering::Acquire)),
            run: SlotId(self.run.load(Ordering::Acquire)),
        }
    }

    /// Consume the "work available" signal raised by a commit.
    #[inline]
    pub fn take_exec_request(&self) -> bool {
        self.exec_requested.swap(false, Ordering::AcqRel)
    }

    /// Body of a slot, with exclusive access to the whole pool.
    #[inline]
    pub fn body(&mut self, id: SlotId) -> &mut SlotBody {
        self.slots[id.index()].body.get_mut()
    }

    /// Wipe a slot's payload. Links are untouched.
    pub fn clear_buffer(&mut self, id: SlotId) {
        self.body(id).reset();
    }

    /// Copy the payload of `src` into `dst`. Links are untouched.
    pub fn copy_buffer(&mut self, dst: SlotId, src: SlotId) {
        let body = *self.body(src);
        *self.body(dst) = body;
    }

    #[inline]
    fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    #[inline]
    fn cursor(cursor: &AtomicU8) -> SlotId {
        SlotId(cursor.load(Ordering::Acquire))
    }

    // ─── Producer context ───────────────────────────────────────────

    /// Claim the slot at the write cursor if it is EMPTY.
    ///
    /// # Safety
    /// Producer context only; at most one producer per pool.
    pub(crate) unsafe fn get_write_buffer(&self) -> Option<SlotId> {
        let id = Self::cursor(&self.write);
        let slot = self.slot(id);
        if slot.state() != BufferState::Empty {
            return None;
        }
        // SAFETY: EMPTY (acquired above) means the consumer released the body.
        unsafe { (*slot.body.get()).reset() };
        slot.set_state(BufferState::Loading);
        self.available.fetch_sub(1, Ordering::AcqRel);
        self.write.store(slot.links.nx.0, Ordering::Release);
        Some(id)
    }

    /// Rewind the write cursor and return its slot to EMPTY.
    ///
    /// # Safety
    /// Producer context only, and only for a slot that was claimed and not
    /// committed.
    pub(crate) unsafe fn unget_write_buffer(&self) {
        let id = self.slot(Self::cursor(&self.write)).links.pv;
        let slot = self.slot(id);
        debug_assert_eq!(slot.state(), BufferState::Loading);
        self.write.store(id.0, Ordering::Release);
        slot.set_state(BufferState::Empty);
        self.available.fetch_add(1, Ordering::AcqRel);
    }

    /// Stamp the slot at the queue cursor with its work item and hand it to
    /// the consumer.
    ///
    /// # Safety
    /// Producer context only; the slot at the queue cursor must be LOADING.
    /// The slot must not be touched again afterwards.
    pub(crate) unsafe fn commit_write_buffer(&self, item: WorkItem) {
        let id = Self::cursor(&self.queue);
        let slot = self.slot(id);
        debug_assert_eq!(slot.state(), BufferState::Loading);
        // SAFETY: LOADING bodies belong to the producer.
        let body = unsafe { &mut *slot.body.get() };
        body.work = Some(item);
        body.move_state = MoveState::New;
        self.queue.store(slot.links.nx.0, Ordering::Release);
        slot.set_state(BufferState::Queued);
        self.exec_requested.store(true, Ordering::Release);
    }

    /// Mutable body of a LOADING slot.
    ///
    /// # Safety
    /// Producer context only; `id` must be LOADING and no other reference to
    /// its body may be live.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn loading_body(&self, id: SlotId) -> &mut SlotBody {
        debug_assert_eq!(self.state(id), BufferState::Loading);
        unsafe { &mut *self.slot(id).body.get() }
    }

    // ─── Consumer context ───────────────────────────────────────────

    /// Promote the run slot to RUNNING and return it; same slot again while
    /// it is RUNNING; `None` if nothing is committed.
    ///
    /// # Safety
    /// Consumer context only; at most one consumer per pool.
    pub(crate) unsafe fn get_run_buffer(&self) -> Option<SlotId> {
        let id = Self::cursor(&self.run);
        let slot = self.slot(id);
        match slot.state() {
            BufferState::Queued | BufferState::Pending => {
                slot.set_state(BufferState::Running);
                Some(id)
            }
            BufferState::Running => Some(id),
            _ => None,
        }
    }

    /// Release the run slot and advance. Returns `Some(true)` if the queue
    /// is empty afterwards (write cursor caught up with the run cursor).
    ///
    /// Only a RUNNING slot is released. Anything else leaves the pool
    /// untouched and returns `None`.
    ///
    /// # Safety
    /// Consumer context only; no reference to the run slot's body may be
    /// live.
    pub(crate) unsafe fn free_run_buffer(&self) -> Option<bool> {
        let id = Self::cursor(&self.run);
        let slot = self.slot(id);
        if slot.state() != BufferState::Running {
            return None;
        }
        // SAFETY: RUNNING (acquired above) bodies belong to the consumer.
        unsafe { (*slot.body.get()).reset() };
        slot.set_state(BufferState::Empty);

        let next = slot.links.nx;
        self.run.store(next.0, Ordering::Release);
        let next_slot = self.slot(next);
        if next_slot.state() == BufferState::Queued {
            next_slot.set_state(BufferState::Pending);
        }
        self.available.fetch_add(1, Ordering::AcqRel);

        Some(Self::cursor(&self.write) == next)
    }

    /// Mutable body of a RUNNING slot.
    ///
    /// # Safety
    /// Consumer context only; `id` must be RUNNING and no other reference to
    /// its body may be live.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn running_body(&self, id: SlotId) -> &mut SlotBody {
        debug_assert_eq!(self.state(id), BufferState::Running);
        unsafe { &mut *self.slot(id).body.get() }
    }

    /// Current run slot without promoting it.
    #[inline]
    pub(crate) fn run_cursor(&self) -> SlotId {
        Self::cursor(&self.run)
    }
}
