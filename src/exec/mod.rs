// src/exec/mod.rs

//! Robot Execution Channel.
//!
//! - [`backend`] provides the `ExecutionBackend` trait and the
//!   `SimulatedBackend` the binary uses, which tests can replace with a fake
//!   implementation.
//! - [`simulator`] owns the loop that drives simulated robots, at most one
//!   goal per robot, and reports positions and completions back to the
//!   runtime as `FleetEvent`s.

pub mod backend;
pub mod simulator;

pub use backend::{ExecutionBackend, ExecutionRequest, SimulatedBackend};
pub use simulator::spawn_simulator;
