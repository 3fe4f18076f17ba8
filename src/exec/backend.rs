// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The runtime talks to an `ExecutionBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake backend in tests while keeping the
//! simulated robots in [`simulator`](super::simulator).
//!
//! - `SimulatedBackend` is the default implementation used by `fleetcoord`.
//!   It wraps the simulator loop and just forwards requests over an mpsc
//!   channel.
//! - Tests can provide their own `ExecutionBackend` that, for example,
//!   records which goals were issued and directly emits completion events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::fleet::FragmentGoal;
use crate::map::TopoMap;
use crate::types::RobotId;

use super::simulator::spawn_simulator;

/// What the coordination loop asks of the robots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRequest {
    /// Execute a fragment, replacing whatever the robot was doing. A hold
    /// fragment only cancels.
    Goal(FragmentGoal),
    /// Abort the robot's current goal.
    Cancel(RobotId),
}

impl ExecutionRequest {
    pub fn robot(&self) -> &str {
        match self {
            ExecutionRequest::Goal(goal) => &goal.robot,
            ExecutionRequest::Cancel(robot) => robot,
        }
    }
}

/// Trait abstracting how fragment goals reach the robots.
///
/// Production code uses [`SimulatedBackend`]; tests can provide their own
/// implementation.
pub trait ExecutionBackend: Send {
    /// Forward the given requests, in order.
    ///
    /// Completion is reported asynchronously as
    /// `FleetEvent::FragmentFinished` on the runtime channel.
    fn execute(
        &mut self,
        requests: Vec<ExecutionRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Backend driving simulated robots along the map.
pub struct SimulatedBackend {
    tx: mpsc::Sender<ExecutionRequest>,
}

impl SimulatedBackend {
    /// Spawn the simulator loop immediately.
    pub fn new(map: TopoMap, secs_per_meter: f64, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_simulator(map, secs_per_meter, runtime_tx);
        Self { tx }
    }
}

impl ExecutionBackend for SimulatedBackend {
    fn execute(
        &mut self,
        requests: Vec<ExecutionRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for request in requests {
                tx.send(request).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
