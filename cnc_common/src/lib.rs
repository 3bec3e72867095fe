//! CNC Common Library
//!
//! Shared constants, axis/motor vector types, the machine-command vocabulary,
//! planner status types and configuration loading for the CNC workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Compile-time limits (axes, motors, pool capacity)
//! - [`planner`] - Types shared between the planner and its collaborators
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod planner;
pub mod prelude;
