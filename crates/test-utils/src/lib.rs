pub mod builders;
pub mod fake_executor;

use std::sync::Once;

use fleetcoord::engine::{CoreCommand, CoreStep};
use fleetcoord::fleet::FragmentGoal;
use fleetcoord::types::{TaskId, TaskState, TaskUpdate};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=fleetcoord=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Everything currently buffered on a notification receiver.
pub fn drain_updates(rx: &mut broadcast::Receiver<TaskUpdate>) -> Vec<TaskUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

/// States published for one task, in order.
pub fn states_of(updates: &[TaskUpdate], task: TaskId) -> Vec<TaskState> {
    updates
        .iter()
        .filter(|u| u.task_id == task)
        .map(|u| u.state)
        .collect()
}

/// Notifications carried by a core step.
pub fn published(step: &CoreStep) -> Vec<TaskUpdate> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Publish(update) => Some(update.clone()),
            _ => None,
        })
        .collect()
}

/// Fragment goals dispatched by a core step.
pub fn dispatched(step: &CoreStep) -> Vec<FragmentGoal> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Dispatch(goal) => Some(goal.clone()),
            _ => None,
        })
        .collect()
}

/// Robots a core step asked to stop.
pub fn cancelled(step: &CoreStep) -> Vec<String> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Cancel { robot } => Some(robot.clone()),
            _ => None,
        })
        .collect()
}
