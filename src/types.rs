use std::fmt;
use std::str::FromStr;

/// Name of a tracked agent (robot or presence-only agent such as a picker).
pub type AgentId = String;
/// Name of a courier robot. Robots are agents too.
pub type RobotId = String;
/// Name of a node in the topological map.
pub type NodeId = String;
/// Identifier of a directed edge in the topological map.
pub type EdgeId = String;
/// Task identifier, assigned on admission and monotonically increasing.
pub type TaskId = u64;
/// Task priority; higher is more urgent.
pub type Priority = u32;

/// State published to pickers / operators whenever a task changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// A robot accepted the task.
    Accept,
    /// The robot reached the picker.
    Arrived,
    /// Loading finished (confirmation or timeout).
    Loaded,
    /// The robot reached the storage node.
    Storage,
    /// Unloading finished at the storage node.
    Delivered,
    /// The assigned robot failed before reaching the picker; the task is
    /// waiting for a new robot.
    Called,
    Cancelled,
    Failed,
    /// The robot is back at base and the task is closed.
    Completed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Accept => "ACCEPT",
            TaskState::Arrived => "ARRIVED",
            TaskState::Loaded => "LOADED",
            TaskState::Storage => "STORAGE",
            TaskState::Delivered => "DELIVERED",
            TaskState::Called => "CALLED",
            TaskState::Cancelled => "CANCELLED",
            TaskState::Failed => "FAILED",
            TaskState::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACCEPT" => Ok(TaskState::Accept),
            "ARRIVED" => Ok(TaskState::Arrived),
            "LOADED" => Ok(TaskState::Loaded),
            "STORAGE" => Ok(TaskState::Storage),
            "DELIVERED" => Ok(TaskState::Delivered),
            "CALLED" => Ok(TaskState::Called),
            "CANCELLED" => Ok(TaskState::Cancelled),
            "FAILED" => Ok(TaskState::Failed),
            "COMPLETED" => Ok(TaskState::Completed),
            other => Err(format!("invalid task state: {other}")),
        }
    }
}

/// Task state-change notification: `{taskId, robotId, state}`.
///
/// `robot_id` is `None` for tasks that never had a robot (e.g. cancelled
/// while pending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub task_id: TaskId,
    pub robot_id: Option<RobotId>,
    pub state: TaskState,
}

impl TaskUpdate {
    pub fn new(task_id: TaskId, robot_id: impl Into<RobotId>, state: TaskState) -> Self {
        Self {
            task_id,
            robot_id: Some(robot_id.into()),
            state,
        }
    }

    pub fn unassigned(task_id: TaskId, state: TaskState) -> Self {
        Self {
            task_id,
            robot_id: None,
            state,
        }
    }
}

impl fmt::Display for TaskUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.robot_id {
            Some(ref robot) => write!(f, "task {} {} {}", self.task_id, robot, self.state),
            None => write!(f, "task {} - {}", self.task_id, self.state),
        }
    }
}
