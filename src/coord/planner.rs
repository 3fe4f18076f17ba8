// src/coord/planner.rs

//! Route Planner.

use tracing::{debug, warn};

use crate::coord::stage::TaskStage;
use crate::errors::CoordError;
use crate::fleet::{FleetStore, Robot};
use crate::map::{AvailableMap, Route, TopoMap};
use crate::tasks::TaskQueue;
use crate::types::{NodeId, RobotId};

/// Result of one planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Travel-stage robots already standing on their destination.
    pub arrived: Vec<RobotId>,
    /// Travel-stage robots left without a route this tick.
    pub unrouted: Vec<RobotId>,
}

/// Node a robot's current stage is about.
///
/// Travel stages head there; wait stages happen there. `None` for idle
/// robots or when the bound task has gone missing.
pub fn stage_destination(robot: &Robot, queue: &TaskQueue, storage: &str) -> Option<NodeId> {
    match robot.stage? {
        TaskStage::GoToPicker | TaskStage::WaitLoading => {
            queue.task(robot.task?).map(|t| t.origin.clone())
        }
        TaskStage::GoToStorage | TaskStage::WaitUnloading => Some(storage.to_string()),
        TaskStage::GoToBase => Some(robot.base_node.clone()),
    }
}

/// Recompute the route of every robot.
///
/// Idle and waiting robots are pinned to where they stand. Travel-stage
/// robots get a shortest route on the available map; their destination is
/// always unblocked for their own search.
pub fn plan_routes(
    fleet: &mut FleetStore,
    queue: &TaskQueue,
    map: &TopoMap,
    storage: &str,
) -> PlanOutcome {
    let view = AvailableMap::from_occupied(fleet.occupied_nodes());
    let mut outcome = PlanOutcome::default();

    for robot in fleet.robots_mut() {
        let travel = robot
            .stage
            .filter(|s| s.is_travel() && robot.is_active());

        let Some(start) = robot.position.best_known().map(str::to_string) else {
            robot.route = Route::default();
            if travel.is_some() {
                warn!(robot = %robot.id, "position unknown; cannot plan");
                outcome.unrouted.push(robot.id.clone());
            }
            continue;
        };

        let Some(stage) = travel else {
            robot.route = Route::stub(start);
            continue;
        };

        let Some(goal) = stage_destination(robot, queue, storage) else {
            warn!(robot = %robot.id, stage = %stage, "stage has no destination");
            robot.route = Route::default();
            outcome.unrouted.push(robot.id.clone());
            continue;
        };

        if start == goal {
            robot.route = Route::stub(start);
            outcome.arrived.push(robot.id.clone());
            continue;
        }

        match plan_travel(map, &view, robot, stage, &start, &goal) {
            Some(route) => {
                debug!(
                    robot = %robot.id,
                    stage = %stage,
                    nodes = ?route.nodes,
                    "route planned"
                );
                robot.route = route;
            }
            None => {
                let err = CoordError::NoRouteFound {
                    from: start,
                    to: goal,
                };
                warn!(robot = %robot.id, stage = %stage, error = %err, "retrying next tick");
                robot.route = Route::default();
                outcome.unrouted.push(robot.id.clone());
            }
        }
    }

    outcome
}

fn plan_travel(
    map: &TopoMap,
    view: &AvailableMap,
    robot: &Robot,
    stage: TaskStage,
    start: &str,
    goal: &str,
) -> Option<Route> {
    if let Some(route) = map.shortest_route(&view.unblocked(goal), start, goal) {
        return Some(route);
    }

    if stage != TaskStage::GoToStorage {
        return None;
    }
    let wait = robot.wait_node.as_deref().filter(|w| *w != start)?;
    debug!(robot = %robot.id, wait, "storage unreachable; heading to wait node");
    map.shortest_route(&view.unblocked(wait), start, wait)
}
