//! # CNC Planner
//!
//! Motion-planning core between a Gcode interpreter and an interrupt-driven
//! step generator.
//!
//! ## Contexts
//!
//! - **Producer** (interpreter loop, non-RT): claims slots from the move
//!   buffer pool, populates them and commits them in program order.
//! - **Consumer** (step timer, hard RT): runs committed slots through the
//!   continuation engine one bounded step per tick and frees them.
//!
//! Both halves come from [`Planner::split`]. No lock is shared between
//! them; ownership of each slot is handed over through its buffer state.
//!
//! ## Zero Allocation
//!
//! The pool is a fixed array sized at compile time. Nothing on the
//! consumer path allocates.

pub mod collab;
pub mod config;
pub mod cycle;
pub mod exec;
pub mod kinematics;
pub mod planner;
pub mod pool;
pub mod position;
pub mod program;
mod queue;
pub mod sim;
pub mod slot;

pub use exec::{ExecContext, ExecStatus};
pub use planner::{Consumer, Planner, Producer, WriteBuffer};
