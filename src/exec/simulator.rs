// src/exec/simulator.rs

//! Simulated robots: walk fragment goals edge by edge.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{FleetEvent, RuntimeEvent};
use crate::exec::backend::ExecutionRequest;
use crate::fleet::{ExecutionReport, FragmentGoal};
use crate::map::TopoMap;
use crate::types::RobotId;

/// Internal handle for a goal being driven.
///
/// - `cancel` aborts the walk; no report is sent for an aborted goal.
/// - `handle` is the Tokio task doing the walking.
struct ActiveGoal {
    goal_id: u64,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background simulator loop.
///
/// **Per robot there is never more than one goal being driven**: a new goal
/// or a cancel request aborts the previous one first.
pub fn spawn_simulator(
    map: TopoMap,
    secs_per_meter: f64,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ExecutionRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecutionRequest>(32);
    let map = Arc::new(map);

    tokio::spawn(async move {
        info!("simulator loop started");

        let mut active: HashMap<RobotId, ActiveGoal> = HashMap::new();

        while let Some(request) = rx.recv().await {
            match request {
                ExecutionRequest::Goal(goal) => {
                    abort_goal(&goal.robot, &mut active);
                    if goal.fragment.is_hold() {
                        continue;
                    }
                    start_goal(goal, &map, secs_per_meter, &runtime_tx, &mut active);
                }
                ExecutionRequest::Cancel(robot) => abort_goal(&robot, &mut active),
            }
        }

        info!("simulator loop finished (channel closed)");
    });

    tx
}

fn start_goal(
    goal: FragmentGoal,
    map: &Arc<TopoMap>,
    secs_per_meter: f64,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    active: &mut HashMap<RobotId, ActiveGoal>,
) {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let robot = goal.robot.clone();
    let goal_id = goal.goal_id;
    let map = Arc::clone(map);
    let rt_tx = runtime_tx.clone();

    let handle = tokio::spawn(async move {
        drive_goal(goal, map, secs_per_meter, rt_tx, cancel_rx).await;
    });

    active.insert(
        robot,
        ActiveGoal {
            goal_id,
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn abort_goal(robot: &str, active: &mut HashMap<RobotId, ActiveGoal>) {
    let Some(mut existing) = active.remove(robot) else {
        return;
    };
    if existing.handle.is_finished() {
        return;
    }

    info!(robot, goal_id = existing.goal_id, "aborting goal");
    if let Some(cancel) = existing.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(robot, goal_id = existing.goal_id, "goal already finished while aborting");
        }
    }
}

/// Walk one goal and report the outcome, unless cancelled first.
async fn drive_goal(
    goal: FragmentGoal,
    map: Arc<TopoMap>,
    secs_per_meter: f64,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let robot = goal.robot.clone();
    let goal_id = goal.goal_id;

    tokio::select! {
        walked = walk(&goal, &map, secs_per_meter, &runtime_tx) => {
            let success = match walked {
                Ok(()) => true,
                Err(err) => {
                    warn!(robot = %robot, goal_id, error = %err, "goal failed");
                    false
                }
            };
            let report = ExecutionReport { robot: robot.clone(), goal_id, success };
            if runtime_tx
                .send(FleetEvent::FragmentFinished(report).into())
                .await
                .is_err()
            {
                debug!(robot = %robot, goal_id, "runtime gone; dropping report");
            }
        }

        _ = &mut cancel_rx => {
            // Aborted (or the simulator dropped us). Do NOT report.
            debug!(robot = %robot, goal_id, "goal aborted");
        }
    }
}

async fn walk(
    goal: &FragmentGoal,
    map: &TopoMap,
    secs_per_meter: f64,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> anyhow::Result<()> {
    debug!(
        robot = %goal.robot,
        goal_id = goal.goal_id,
        nodes = ?goal.fragment.nodes,
        "driving goal"
    );

    for pair in goal.fragment.nodes.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let distance = map
            .edge_distance(from, to)
            .ok_or_else(|| anyhow!("no edge {from} -> {to}"))?;

        tokio::time::sleep(Duration::from_secs_f64(distance * secs_per_meter)).await;

        runtime_tx
            .send(
                FleetEvent::CurrentNodeChanged {
                    agent: goal.robot.clone(),
                    node: Some(to.clone()),
                }
                .into(),
            )
            .await
            .with_context(|| format!("reporting position of '{}'", goal.robot))?;
    }
    Ok(())
}
