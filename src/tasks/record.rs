// src/tasks/record.rs

use crate::types::{NodeId, Priority, RobotId, TaskId};

/// A transport request as submitted by a picker or operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub priority: Priority,
    /// Pick-up node.
    pub origin: NodeId,
    /// Free-form action tag carried along with the task.
    pub payload: String,
}

impl TaskRequest {
    pub fn new(priority: Priority, origin: impl Into<NodeId>) -> Self {
        Self {
            priority,
            origin: origin.into(),
            payload: String::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// An admitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub priority: Priority,
    pub origin: NodeId,
    pub payload: String,
}

/// Lifecycle bucket of a task. A task is in exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskBucket {
    Pending,
    Processing { robot: RobotId },
    Completed,
    Cancelled,
    Failed,
}

impl TaskBucket {
    pub fn label(&self) -> &'static str {
        match self {
            TaskBucket::Pending => "pending",
            TaskBucket::Processing { .. } => "processing",
            TaskBucket::Completed => "completed",
            TaskBucket::Cancelled => "cancelled",
            TaskBucket::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskBucket::Completed | TaskBucket::Cancelled | TaskBucket::Failed
        )
    }

    pub fn robot(&self) -> Option<&str> {
        match self {
            TaskBucket::Processing { robot } => Some(robot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task: Task,
    pub bucket: TaskBucket,
}

/// All tasks partitioned by bucket. Pending tasks are listed in the order
/// the assignment engine would consider them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub pending: Vec<Task>,
    pub processing: Vec<(Task, RobotId)>,
    pub completed: Vec<Task>,
    pub cancelled: Vec<Task>,
    pub failed: Vec<Task>,
}

impl TaskSnapshot {
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.pending.iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
            + self.processing.len()
            + self.completed.len()
            + self.cancelled.len()
            + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
