// tests/simulator.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use fleetcoord::engine::{FleetEvent, RuntimeEvent};
use fleetcoord::exec::{ExecutionBackend, ExecutionRequest, SimulatedBackend};
use fleetcoord::fleet::FragmentGoal;
use fleetcoord::map::{RouteFragment, TopoMap};
use fleetcoord_test_utils::builders::MapBuilder;
use fleetcoord_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// `A - B - C`, one metre per edge.
fn line_map() -> TopoMap {
    MapBuilder::new()
        .nodes(&["A", "B", "C"])
        .chain(&["A", "B", "C"])
        .build()
}

fn goal(robot: &str, goal_id: u64, nodes: &[&str]) -> ExecutionRequest {
    ExecutionRequest::Goal(FragmentGoal {
        robot: robot.to_string(),
        goal_id,
        fragment: RouteFragment {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            edges: nodes.windows(2).map(|w| format!("{}_{}", w[0], w[1])).collect(),
        },
    })
}

/// Simulator backend at one second per metre, plus the runtime end of its
/// event channel.
fn simulator() -> (SimulatedBackend, mpsc::Receiver<RuntimeEvent>) {
    let (rt_tx, rt_rx) = mpsc::channel(32);
    (SimulatedBackend::new(line_map(), 1.0, rt_tx), rt_rx)
}

fn describe(event: RuntimeEvent) -> String {
    match event {
        RuntimeEvent::Fleet(FleetEvent::CurrentNodeChanged { agent, node }) => {
            format!("{agent} at {}", node.unwrap_or_default())
        }
        RuntimeEvent::Fleet(FleetEvent::FragmentFinished(report)) => format!(
            "{} goal {} {}",
            report.robot,
            report.goal_id,
            if report.success { "done" } else { "failed" }
        ),
        other => panic!("unexpected event from simulator: {other:?}"),
    }
}

async fn next_event(rx: &mut mpsc::Receiver<RuntimeEvent>) -> String {
    let event = with_timeout(rx.recv()).await.expect("simulator channel closed");
    describe(event)
}

/// Let every pending walk run out, then assert nothing else was reported.
async fn assert_quiet(rx: &mut mpsc::Receiver<RuntimeEvent>) {
    time::sleep(Duration::from_secs(30)).await;
    if let Ok(event) = rx.try_recv() {
        panic!("unexpected late event: {}", describe(event));
    }
}

#[tokio::test(start_paused = true)]
async fn test_goal_reports_each_node_then_finishes() -> TestResult {
    init_tracing();
    let (mut backend, mut rx) = simulator();
    let started = Instant::now();

    backend.execute(vec![goal("r1", 1, &["A", "B", "C"])]).await?;

    assert_eq!(next_event(&mut rx).await, "r1 at B");
    assert_eq!(next_event(&mut rx).await, "r1 at C");
    assert_eq!(next_event(&mut rx).await, "r1 goal 1 done");
    assert!(started.elapsed() >= Duration::from_secs(2));

    assert_quiet(&mut rx).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_new_goal_replaces_the_running_one_without_report() -> TestResult {
    init_tracing();
    let (mut backend, mut rx) = simulator();

    backend.execute(vec![goal("r1", 1, &["A", "B", "C"])]).await?;
    assert_eq!(next_event(&mut rx).await, "r1 at B");

    // Halfway along B -> C, turn back.
    time::sleep(Duration::from_millis(500)).await;
    backend.execute(vec![goal("r1", 2, &["B", "A"])]).await?;

    assert_eq!(next_event(&mut rx).await, "r1 at A");
    assert_eq!(next_event(&mut rx).await, "r1 goal 2 done");
    assert_quiet(&mut rx).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_and_hold_stop_the_robot_silently() -> TestResult {
    init_tracing();
    let (mut backend, mut rx) = simulator();

    backend
        .execute(vec![
            goal("r1", 1, &["A", "B", "C"]),
            goal("r2", 1, &["C", "B", "A"]),
        ])
        .await?;
    time::sleep(Duration::from_millis(500)).await;

    let hold = ExecutionRequest::Goal(FragmentGoal {
        robot: "r2".to_string(),
        goal_id: 2,
        fragment: RouteFragment::hold("C"),
    });
    backend
        .execute(vec![ExecutionRequest::Cancel("r1".to_string()), hold])
        .await?;

    assert_quiet(&mut rx).await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_edge_reports_failure() -> TestResult {
    init_tracing();
    let (mut backend, mut rx) = simulator();

    // No direct edge between A and C.
    backend.execute(vec![goal("r1", 7, &["A", "C"])]).await?;

    assert_eq!(next_event(&mut rx).await, "r1 goal 7 failed");
    assert_quiet(&mut rx).await;
    Ok(())
}
