// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::{NodeId, RobotId, TaskId};

#[derive(Error, Debug)]
pub enum CoordError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Map error: {0}")]
    MapError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Task submission rejected because the pending buffer is at capacity.
    #[error("task queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// Operation on a task id that was never admitted.
    #[error("invalid task id: {0}")]
    InvalidTaskId(TaskId),

    /// Operation not allowed in the task's current bucket (e.g. cancelling a
    /// completed task).
    #[error("task {task} is {state} and cannot be changed")]
    InvalidState { task: TaskId, state: &'static str },

    #[error("unknown robot: {0}")]
    UnknownRobot(RobotId),

    /// Soft failure: the planner retries on the next tick.
    #[error("no route from {from} to {to}")]
    NoRouteFound { from: NodeId, to: NodeId },

    /// Reported by the execution channel; handled per stage.
    #[error("robot {robot} failed to execute its route fragment during {stage}")]
    RobotExecutionFailure { robot: RobotId, stage: &'static str },

    /// Processing tasks and robot bindings disagree. Core state is corrupt.
    #[error("inconsistent assignment: {0}")]
    InconsistentAssignment(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CoordError>;
