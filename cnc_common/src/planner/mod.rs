//! Planner shared types.
//!
//! Everything the planner exchanges with its collaborators (the canonical
//! machine above it, the step layer below it) lives here: axis and motor
//! vectors, run/motion state enums, queued machine commands and the planner
//! error taxonomy.

pub mod command;
pub mod config;
pub mod error;
pub mod state;
