// src/engine/event_handlers.rs

//! Event and tick handling logic for the core runtime.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use crate::config::FleetConfig;
use crate::coord::{
    assign_tasks, plan_routes, split_critical_paths, stage_destination, transition, ActiveRoute,
    StageEvent, TaskStage, Transition,
};
use crate::engine::FleetEvent;
use crate::errors::{CoordError, Result};
use crate::fleet::{FleetStore, FragmentGoal, Lifecycle, Robot};
use crate::map::TopoMap;
use crate::tasks::{CancelOutcome, TaskQueue};
use crate::types::{RobotId, TaskId, TaskState, TaskUpdate};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Hand a fragment goal to the execution channel.
    Dispatch(FragmentGoal),
    /// Abort whatever the robot is executing.
    Cancel { robot: RobotId },
    /// Publish a task state change.
    Publish(TaskUpdate),
}

/// Decision returned by the core after an event or a tick.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Mutable coordination state the handlers work on.
#[derive(Debug, Clone)]
pub struct CoordState {
    pub fleet: FleetStore,
    pub queue: TaskQueue,
    pub map: TopoMap,
    /// Routes must be recomputed on the next tick.
    pub replan: bool,
}

/// Apply a producer event. Only single-field writes happen here, plus the
/// fleet/map management events which flag a replan.
pub fn handle_fleet_event(
    state: &mut CoordState,
    event: FleetEvent,
    now: Instant,
    out: &mut Vec<CoreCommand>,
) -> Result<()> {
    match event {
        FleetEvent::CurrentNodeChanged { agent, node } => {
            if !state.fleet.set_current_node(&agent, node) {
                trace!(agent = %agent, "position update for untracked agent");
            }
        }
        FleetEvent::ClosestNodeChanged { agent, node } => {
            if !state.fleet.set_closest_node(&agent, node) {
                trace!(agent = %agent, "closest-node update for untracked agent");
            }
        }
        FleetEvent::FragmentFinished(report) => {
            let Some(robot) = state.fleet.get_mut(&report.robot) else {
                debug!(robot = %report.robot, "report for unknown robot ignored");
                return Ok(());
            };
            let goal_id = report.goal_id;
            if !robot.accept_report(report) {
                debug!(robot = %robot.id, goal_id, "stale execution report ignored");
            }
        }
        FleetEvent::TrayLoaded { robot } => match state.fleet.get_mut(&robot) {
            Some(r) => r.load_confirmed = true,
            None => debug!(robot = %robot, "tray signal for unknown robot"),
        },
        FleetEvent::TrayUnloaded { robot } => match state.fleet.get_mut(&robot) {
            Some(r) => r.unload_confirmed = true,
            None => debug!(robot = %robot, "tray signal for unknown robot"),
        },
        FleetEvent::RegisterRobot { robot, config } => {
            if !state.map.contains(&config.base_node) {
                warn!(
                    robot = %robot,
                    base = %config.base_node,
                    "base node not on the map; registration refused"
                );
                return Ok(());
            }
            match state.fleet.register(robot.clone(), &config, now) {
                Ok(()) => {
                    info!(robot = %robot, base = %config.base_node, "robot registered");
                    state.replan = true;
                }
                Err(err) => warn!(robot = %robot, error = %err, "registration refused"),
            }
        }
        FleetEvent::DeregisterRobot { robot } => deregister_robot(state, &robot, out)?,
        FleetEvent::MapUpdated(map) => {
            info!(
                nodes = map.node_count(),
                edges = map.edge_count(),
                "map snapshot replaced"
            );
            for robot in state.fleet.robots() {
                if !map.contains(&robot.base_node) {
                    warn!(
                        robot = %robot.id,
                        base = %robot.base_node,
                        "base node missing from new map"
                    );
                }
            }
            state.map = map;
            state.replan = true;
        }
    }
    Ok(())
}

/// Remove a robot from the fleet. A task it was carrying goes back to the
/// queue if the picker was not reached yet, and fails otherwise.
pub fn deregister_robot(
    state: &mut CoordState,
    id: &str,
    out: &mut Vec<CoreCommand>,
) -> Result<()> {
    let Some(robot) = state.fleet.deregister(id) else {
        debug!(robot = %id, "deregistering unknown robot");
        return Ok(());
    };

    if robot.issued.is_some() {
        out.push(CoreCommand::Cancel {
            robot: robot.id.clone(),
        });
    }
    if let Some(task) = robot.task {
        if robot.stage == Some(TaskStage::GoToPicker) {
            state.queue.requeue_task(task)?;
            out.push(CoreCommand::Publish(TaskUpdate::new(task, id, TaskState::Called)));
        } else {
            state.queue.fail(task)?;
            out.push(CoreCommand::Publish(TaskUpdate::new(task, id, TaskState::Failed)));
        }
    }
    info!(robot = %id, task = ?robot.task, "robot deregistered");
    state.replan = true;
    Ok(())
}

/// Cancel a task. A processing task's robot is stopped and sent to base; the
/// new route is computed on the next tick.
pub fn cancel_task(
    state: &mut CoordState,
    task: TaskId,
    now: Instant,
    out: &mut Vec<CoreCommand>,
) -> Result<CancelOutcome> {
    let outcome = state.queue.cancel(task)?;

    match outcome {
        CancelOutcome::WasPending => {
            info!(task, "pending task cancelled");
            out.push(CoreCommand::Publish(TaskUpdate::unassigned(
                task,
                TaskState::Cancelled,
            )));
        }
        CancelOutcome::WasProcessing { ref robot } => {
            let r = state.fleet.get_mut(robot).ok_or_else(|| {
                CoordError::InconsistentAssignment(format!(
                    "task {task} is processing on unknown robot '{robot}'"
                ))
            })?;
            info!(
                task,
                robot = %robot,
                stage = ?r.stage,
                "processing task cancelled; recalling robot"
            );

            r.task = None;
            if r.issued.is_some() || r.is_moving() {
                out.push(CoreCommand::Cancel {
                    robot: robot.clone(),
                });
            }
            send_robot_to_base(r, now);
            out.push(CoreCommand::Publish(TaskUpdate::new(
                task,
                robot.clone(),
                TaskState::Cancelled,
            )));
            state.replan = true;
        }
    }
    Ok(outcome)
}

/// Send a robot home.
///
/// A robot already standing on its base node becomes idle on the spot;
/// otherwise it stays active with its stage forced to `go_to_base` and gets a
/// route on the next planning pass. Returns `true` if the robot is now idle.
pub fn send_robot_to_base(robot: &mut Robot, now: Instant) -> bool {
    if robot.is_at(&robot.base_node) {
        debug!(robot = %robot.id, "already at base; now idle");
        robot.make_idle();
        return true;
    }

    debug!(robot = %robot.id, base = %robot.base_node, "sending robot to base");
    robot.lifecycle = Lifecycle::Active { moving: false };
    robot.issued = None;
    robot.report = None;
    robot.clear_plan();
    robot.enter_stage(TaskStage::GoToBase, now);
    false
}

/// Run the assignment engine and publish `ACCEPT` for every new binding.
pub fn run_assignment(
    state: &mut CoordState,
    now: Instant,
    out: &mut Vec<CoreCommand>,
) -> Result<()> {
    let assignments = assign_tasks(&mut state.fleet, &mut state.queue, &state.map, now)?;
    if assignments.is_empty() {
        return Ok(());
    }
    for a in assignments {
        out.push(CoreCommand::Publish(TaskUpdate::new(
            a.task,
            a.robot,
            TaskState::Accept,
        )));
    }
    state.replan = true;
    Ok(())
}

/// Advance every active robot's stage machine against the latest execution
/// reports, tray signals and timeouts.
pub fn handle_tasks(
    state: &mut CoordState,
    config: &FleetConfig,
    now: Instant,
    out: &mut Vec<CoreCommand>,
) -> Result<()> {
    let any_moving = state.fleet.any_moving();

    for id in state.fleet.ids() {
        let Some(robot) = state.fleet.get_mut(&id) else {
            continue;
        };
        let Some(stage) = robot.stage else {
            continue;
        };

        let event = if let Some(report) = robot.report.take() {
            robot.finish_goal();
            if report.success {
                let destination = stage_destination(robot, &state.queue, config.storage_node());
                if destination.is_some_and(|d| robot.is_at(&d)) {
                    StageEvent::RouteCompleted
                } else {
                    debug!(robot = %id, stage = %stage, "fragment done; more route to go");
                    state.replan = true;
                    continue;
                }
            } else {
                let err = CoordError::RobotExecutionFailure {
                    robot: id.clone(),
                    stage: stage.label(),
                };
                warn!(robot = %id, task = ?robot.task, error = %err, "execution failed");
                StageEvent::ExecutionFailed
            }
        } else if stage.is_wait() {
            let (confirmed, timeout) = match stage {
                TaskStage::WaitLoading => (robot.load_confirmed, config.load_timeout()),
                _ => (robot.unload_confirmed, config.unload_timeout()),
            };
            if confirmed {
                StageEvent::Confirmed
            } else if now.saturating_duration_since(robot.stage_started) > timeout {
                debug!(robot = %id, stage = %stage, ?timeout, "wait stage timed out");
                StageEvent::TimedOut
            } else {
                continue;
            }
        } else {
            if !robot.is_moving() && (robot.route.is_empty() || !any_moving) {
                state.replan = true;
            }
            continue;
        };

        apply_transition(state, &id, stage, event, now, out)?;
    }
    Ok(())
}

/// Apply the stage machine's verdict for one robot.
pub fn apply_transition(
    state: &mut CoordState,
    id: &str,
    stage: TaskStage,
    event: StageEvent,
    now: Instant,
    out: &mut Vec<CoreCommand>,
) -> Result<()> {
    let robot = state.fleet.robot_mut(id)?;
    let task = robot.task;

    match transition(stage, event) {
        Transition::Advance { next, notify } => {
            robot.enter_stage(next, now);
            info!(robot = %id, task = ?task, from = %stage, to = %next, "stage transition");
            if let Some(task) = task {
                out.push(CoreCommand::Publish(TaskUpdate::new(task, id, notify)));
            }
        }
        Transition::Finish => {
            robot.make_idle();
            info!(robot = %id, task = ?task, "robot back at base");
            if let Some(task) = task {
                state.queue.complete(task)?;
                out.push(CoreCommand::Publish(TaskUpdate::new(
                    task,
                    id,
                    TaskState::Completed,
                )));
            }
        }
        Transition::Requeue => {
            robot.task = None;
            send_robot_to_base(robot, now);
            if let Some(task) = task {
                warn!(robot = %id, task, "task handed back to the queue");
                state.queue.requeue_task(task)?;
                out.push(CoreCommand::Publish(TaskUpdate::new(task, id, TaskState::Called)));
            }
        }
        Transition::Fail => {
            robot.task = None;
            send_robot_to_base(robot, now);
            if let Some(task) = task {
                warn!(robot = %id, task, stage = %stage, "task failed");
                state.queue.fail(task)?;
                out.push(CoreCommand::Publish(TaskUpdate::new(task, id, TaskState::Failed)));
            }
        }
        Transition::RetryBase => {
            warn!(robot = %id, "failed on the way to base; retrying");
            send_robot_to_base(robot, now);
        }
        Transition::Stay => return Ok(()),
    }

    state.replan = true;
    Ok(())
}

/// Route Planner, then Critical-Section Scheduler, then issue every active
/// robot's first fragment if it differs from what it is executing.
pub fn replan_and_dispatch(
    state: &mut CoordState,
    config: &FleetConfig,
    now: Instant,
    out: &mut Vec<CoreCommand>,
) -> Result<()> {
    state.replan = false;

    let outcome = plan_routes(
        &mut state.fleet,
        &state.queue,
        &state.map,
        config.storage_node(),
    );
    if !outcome.unrouted.is_empty() {
        debug!(robots = ?outcome.unrouted, "no route this tick");
    }

    for id in outcome.arrived {
        let robot = state.fleet.robot_mut(&id)?;
        let Some(stage) = robot.stage else {
            continue;
        };
        if robot.issued.is_some() {
            out.push(CoreCommand::Cancel { robot: id.clone() });
        }
        robot.finish_goal();
        apply_transition(state, &id, stage, StageEvent::RouteCompleted, now, out)?;
    }

    let mut routes = BTreeMap::new();
    for robot in state.fleet.active() {
        if robot.route.is_empty() {
            continue;
        }
        let active = match (robot.stage, robot.task) {
            (Some(TaskStage::GoToPicker), Some(task)) => match state.queue.task(task) {
                Some(t) => ActiveRoute::to_picker(robot.route.clone(), t.origin.clone()),
                None => ActiveRoute::new(robot.route.clone()),
            },
            _ => ActiveRoute::new(robot.route.clone()),
        };
        routes.insert(robot.id.clone(), active);
    }

    let mut plan = split_critical_paths(&routes);
    if !plan.winners.is_empty() {
        debug!(winners = ?plan.winners, "critical points");
    }

    for robot in state.fleet.robots_mut() {
        robot.fragments = plan.fragments.remove(&robot.id).unwrap_or_default();
        if robot.is_active() {
            dispatch_first_fragment(robot, out);
        }
    }
    Ok(())
}

/// Issue the first fragment of `robot` unless it is already executing it.
///
/// A hold fragment, or no route at all, stops a robot still executing an
/// older goal.
pub fn dispatch_first_fragment(robot: &mut Robot, out: &mut Vec<CoreCommand>) {
    let first = match robot.fragments.first() {
        Some(first) if !first.is_hold() => first.clone(),
        held => {
            if robot.issued.is_some() || robot.is_moving() {
                let node = held.and_then(|hold| hold.start());
                debug!(robot = %robot.id, ?node, "no fragment to drive; stopping robot");
                out.push(CoreCommand::Cancel {
                    robot: robot.id.clone(),
                });
                robot.finish_goal();
            }
            return;
        }
    };

    if robot
        .issued
        .as_ref()
        .is_some_and(|goal| goal.fragment == first)
    {
        return;
    }

    let goal = FragmentGoal {
        robot: robot.id.clone(),
        goal_id: robot.next_goal_id(),
        fragment: first,
    };
    debug!(
        robot = %robot.id,
        goal_id = goal.goal_id,
        nodes = ?goal.fragment.nodes,
        "issuing fragment"
    );
    robot.issued = Some(goal.clone());
    robot.report = None;
    robot.set_moving(true);
    out.push(CoreCommand::Dispatch(goal));
}

/// Every processing task has exactly one robot bound to it and vice versa.
pub fn check_bindings(state: &CoordState) -> Result<()> {
    for (task, robot) in state.queue.processing() {
        match state.fleet.get(robot) {
            Some(r) if r.task == Some(task) => {}
            Some(r) => {
                return Err(inconsistent(format!(
                    "task {task} is processing on '{robot}', which holds {:?}",
                    r.task
                )));
            }
            None => {
                return Err(inconsistent(format!(
                    "task {task} is processing on unknown robot '{robot}'"
                )));
            }
        }
    }

    for (robot, task) in state.fleet.bindings() {
        let bound = state
            .queue
            .get(task)
            .and_then(|record| record.bucket.robot());
        if bound != Some(robot) {
            return Err(inconsistent(format!(
                "robot '{robot}' holds task {task}, which is bound to {bound:?}"
            )));
        }
    }
    Ok(())
}

fn inconsistent(msg: String) -> CoordError {
    error!(%msg, "assignment invariant violated");
    CoordError::InconsistentAssignment(msg)
}
