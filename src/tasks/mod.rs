// src/tasks/mod.rs

//! Task Queue: pending buffer and task records across the pending,
//! processing, completed, cancelled and failed buckets.

pub mod queue;
pub mod record;

pub use queue::{CancelOutcome, TaskQueue};
pub use record::{Task, TaskBucket, TaskRecord, TaskRequest, TaskSnapshot};
