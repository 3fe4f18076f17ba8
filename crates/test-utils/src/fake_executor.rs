use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use fleetcoord::engine::{FleetEvent, RuntimeEvent};
use fleetcoord::errors::Result;
use fleetcoord::exec::{ExecutionBackend, ExecutionRequest};
use fleetcoord::fleet::ExecutionReport;

/// A fake execution backend that:
/// - records every request it receives
/// - "teleports" the robot to the end of each goal and immediately reports
///   success, or failure for robots listed in `failing`.
///
/// Reports are sent from a spawned task so the runtime never waits on its
/// own event channel.
pub struct FakeExecutor {
    runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
    requests: Arc<Mutex<Vec<ExecutionRequest>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: tokio::sync::mpsc::Sender<RuntimeEvent>,
        requests: Arc<Mutex<Vec<ExecutionRequest>>>,
    ) -> Self {
        Self {
            runtime_tx,
            requests,
            failing: HashSet::new(),
        }
    }

    /// Every goal of `robot` fails without moving it.
    pub fn failing(mut self, robot: &str) -> Self {
        self.failing.insert(robot.to_string());
        self
    }
}

impl ExecutionBackend for FakeExecutor {
    fn execute(
        &mut self,
        requests: Vec<ExecutionRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = Arc::clone(&self.requests);
        let failing = self.failing.clone();

        Box::pin(async move {
            for request in requests {
                log.lock().unwrap().push(request.clone());

                let ExecutionRequest::Goal(goal) = request else {
                    continue;
                };
                if goal.fragment.is_hold() {
                    continue;
                }

                let success = !failing.contains(&goal.robot);
                let end = goal.fragment.end().map(str::to_string);
                let tx = tx.clone();
                tokio::spawn(async move {
                    if success {
                        let _ = tx
                            .send(
                                FleetEvent::CurrentNodeChanged {
                                    agent: goal.robot.clone(),
                                    node: end,
                                }
                                .into(),
                            )
                            .await;
                    }
                    let report = ExecutionReport {
                        robot: goal.robot,
                        goal_id: goal.goal_id,
                        success,
                    };
                    let _ = tx.send(FleetEvent::FragmentFinished(report).into()).await;
                });
            }
            Ok(())
        })
    }
}
