// src/engine/query.rs

//! Read-only views exposed to operators and visualisation.

use std::time::Instant;

use crate::coord::stage_destination;
use crate::engine::event_handlers::CoordState;
use crate::errors::Result;
use crate::map::RoutePose;
use crate::tasks::{Task, TaskBucket};
use crate::types::{NodeId, RobotId, TaskId};

/// Current / goal / state of one robot.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotStatus {
    pub robot: RobotId,
    /// Stage label, or `"idle"`.
    pub state: String,
    pub moving: bool,
    pub task: Option<TaskId>,
    pub current_node: Option<NodeId>,
    pub goal_node: Option<NodeId>,
    /// When the current stage started; `None` for idle robots.
    pub stage_started: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub task: Task,
    pub bucket: TaskBucket,
}

pub fn robot_status(state: &CoordState, storage: &str, robot: &str) -> Result<RobotStatus> {
    let r = state.fleet.robot(robot)?;
    Ok(RobotStatus {
        robot: r.id.clone(),
        state: r
            .stage
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| "idle".to_string()),
        moving: r.is_moving(),
        task: r.task,
        current_node: r.position.best_known().map(str::to_string),
        goal_node: stage_destination(r, &state.queue, storage),
        stage_started: r.stage.map(|_| r.stage_started),
    })
}

pub fn task_status(state: &CoordState, task: TaskId) -> Result<TaskStatus> {
    let record = state.queue.record(task)?;
    Ok(TaskStatus {
        task: record.task.clone(),
        bucket: record.bucket.clone(),
    })
}

/// Coordinates of the robot's planned route, for visualisation.
pub fn robot_route(state: &CoordState, robot: &str) -> Result<Vec<RoutePose>> {
    let r = state.fleet.robot(robot)?;
    Ok(state.map.poses(&r.route.nodes))
}
