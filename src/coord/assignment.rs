// src/coord/assignment.rs

//! Assignment Engine: match pending tasks to idle robots by route distance.

use std::time::Instant;

use tracing::{debug, info};

use crate::errors::Result;
use crate::fleet::FleetStore;
use crate::map::{AvailableMap, TopoMap};
use crate::tasks::{Task, TaskQueue};
use crate::types::{RobotId, TaskId};

/// A task bound to a robot during this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task: TaskId,
    pub robot: RobotId,
}

/// Run one assignment pass.
///
/// Every pending task is drained and considered in priority order
/// (descending), then by ascending id. Each task goes to the closest
/// eligible idle robot; tasks nobody can take go back into the queue in
/// their original order.
pub fn assign_tasks(
    fleet: &mut FleetStore,
    queue: &mut TaskQueue,
    map: &TopoMap,
    now: Instant,
) -> Result<Vec<Assignment>> {
    let tasks = queue.drain_pending();
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let view = AvailableMap::from_occupied(fleet.occupied_nodes());
    let mut assignments = Vec::new();
    let mut unmatched = Vec::new();

    for task in tasks {
        let Some((robot, distance)) = find_closest_robot(fleet, map, &view, &task) else {
            debug!(task = task.id, origin = %task.origin, "no eligible robot; task stays pending");
            unmatched.push(task.id);
            continue;
        };

        queue.mark_processing(task.id, &robot)?;
        fleet.robot_mut(&robot)?.activate(task.id, now);

        info!(
            task = task.id,
            robot = %robot,
            priority = task.priority,
            distance,
            "task assigned"
        );
        assignments.push(Assignment {
            task: task.id,
            robot,
        });
    }

    queue.requeue(unmatched);
    Ok(assignments)
}

/// Closest idle robot that accepts `task`'s priority and can reach its
/// origin on the available map.
///
/// Ties go to the lowest robot id.
pub fn find_closest_robot(
    fleet: &FleetStore,
    map: &TopoMap,
    view: &AvailableMap,
    task: &Task,
) -> Option<(RobotId, f64)> {
    let view = view.unblocked(&task.origin);
    let mut best: Option<(&str, f64)> = None;

    for robot in fleet.idle() {
        if !robot.accepts(task.priority) {
            continue;
        }
        let Some(start) = robot.position.best_known() else {
            continue;
        };
        let Some(route) = map.shortest_route(&view, start, &task.origin) else {
            continue;
        };

        let distance = route.total_distance();
        if !distance.is_finite() {
            continue;
        }
        match best {
            Some((_, closest)) if distance >= closest => {}
            _ => best = Some((robot.id.as_str(), distance)),
        }
    }

    best.map(|(id, distance)| (id.to_string(), distance))
}
