// src/fleet/mod.rs

//! Fleet State Store: per-robot position, lifecycle, stage, route and the
//! goal currently being executed.
//!
//! Producers only perform single-field writes here (position updates,
//! tray signals, execution reports). All decisions are taken by the
//! coordination loop.

pub mod robot;
pub mod store;

pub use robot::{ExecutionReport, FragmentGoal, Lifecycle, Position, Robot};
pub use store::FleetStore;
