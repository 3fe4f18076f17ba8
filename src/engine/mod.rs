// src/engine/mod.rs

//! Coordination loop for fleetcoord.
//!
//! This module ties together:
//! - the fleet state store and the task queue
//! - assignment, planning and critical-section scheduling
//! - the main runtime event loop that reacts to:
//!   - position feeds
//!   - fragment completion reports
//!   - load / unload confirmations
//!   - task submission, cancellation and queries
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use tokio::sync::oneshot;

use crate::config::RobotConfig;
use crate::errors::Result;
use crate::fleet::ExecutionReport;
use crate::map::{RoutePose, TopoMap};
use crate::tasks::{CancelOutcome, TaskRequest, TaskSnapshot};
use crate::types::{AgentId, NodeId, RobotId, TaskId};

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no task is pending or processing and
    /// every robot is idle.
    pub exit_when_idle: bool,
}

/// Producer-side events.
///
/// The core applies these as plain writes to the fleet store; decisions are
/// deferred to the next tick.
#[derive(Debug, Clone)]
pub enum FleetEvent {
    /// Position feed. `None` is the "unknown" sentinel.
    CurrentNodeChanged {
        agent: AgentId,
        node: Option<NodeId>,
    },
    ClosestNodeChanged {
        agent: AgentId,
        node: Option<NodeId>,
    },
    /// The execution channel finished (or failed) a fragment goal.
    FragmentFinished(ExecutionReport),
    TrayLoaded {
        robot: RobotId,
    },
    TrayUnloaded {
        robot: RobotId,
    },
    RegisterRobot {
        robot: RobotId,
        config: RobotConfig,
    },
    DeregisterRobot {
        robot: RobotId,
    },
    /// Map-change notification carrying a full snapshot.
    MapUpdated(TopoMap),
}

impl FleetEvent {
    /// Build a `CurrentNodeChanged` from a raw feed value, mapping the
    /// `"unknown"` / `"none"` sentinels (and empty strings) to `None`.
    pub fn current_node(agent: impl Into<AgentId>, raw: &str) -> Self {
        FleetEvent::CurrentNodeChanged {
            agent: agent.into(),
            node: feed_node(raw),
        }
    }

    pub fn closest_node(agent: impl Into<AgentId>, raw: &str) -> Self {
        FleetEvent::ClosestNodeChanged {
            agent: agent.into(),
            node: feed_node(raw),
        }
    }
}

fn feed_node(raw: &str) -> Option<NodeId> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("unknown") || raw.eq_ignore_ascii_case("none")
    {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Events flowing into the runtime from feeds, the execution backend and
/// task originators.
///
/// Request/response operations carry a `oneshot` reply sender.
#[derive(Debug)]
pub enum RuntimeEvent {
    Fleet(FleetEvent),
    SubmitTask {
        request: TaskRequest,
        reply: oneshot::Sender<Result<TaskId>>,
    },
    CancelTask {
        task: TaskId,
        reply: oneshot::Sender<Result<CancelOutcome>>,
    },
    QueryRobot {
        robot: RobotId,
        reply: oneshot::Sender<Result<RobotStatus>>,
    },
    QueryTask {
        task: TaskId,
        reply: oneshot::Sender<Result<TaskStatus>>,
    },
    QueryTasks {
        reply: oneshot::Sender<TaskSnapshot>,
    },
    QueryRoute {
        robot: RobotId,
        reply: oneshot::Sender<Result<Vec<RoutePose>>>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

impl From<FleetEvent> for RuntimeEvent {
    fn from(event: FleetEvent) -> Self {
        RuntimeEvent::Fleet(event)
    }
}

pub mod core;
pub mod event_handlers;
pub mod query;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoordState, CoreCommand, CoreStep};
pub use query::{RobotStatus, TaskStatus};
pub use runtime::Runtime;
