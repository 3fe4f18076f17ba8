// src/fleet/robot.rs

use std::time::Instant;

use crate::config::RobotConfig;
use crate::coord::TaskStage;
use crate::map::{Route, RouteFragment};
use crate::types::{NodeId, Priority, RobotId, TaskId};

/// Where an agent is on the map.
///
/// `current` is authoritative when known. `previous` remembers the last
/// known current node so an agent between nodes still occupies something;
/// `closest` is the localisation fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub current: Option<NodeId>,
    pub previous: Option<NodeId>,
    pub closest: Option<NodeId>,
}

impl Position {
    pub fn at(node: impl Into<NodeId>) -> Self {
        Self {
            current: Some(node.into()),
            previous: None,
            closest: None,
        }
    }

    /// Current node, else the previous current node, else the closest node.
    pub fn best_known(&self) -> Option<&str> {
        self.current
            .as_deref()
            .or(self.previous.as_deref())
            .or(self.closest.as_deref())
    }

    pub fn set_current(&mut self, node: Option<NodeId>) {
        if node == self.current {
            return;
        }
        if let Some(old) = self.current.take() {
            self.previous = Some(old);
        }
        self.current = node;
    }

    pub fn set_closest(&mut self, node: Option<NodeId>) {
        self.closest = node;
    }
}

/// Lifecycle bucket. `moving` only exists inside `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Active { moving: bool },
}

/// A fragment goal handed to the execution channel.
///
/// An empty (hold) fragment means "stop": the backend cancels whatever the
/// robot is executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentGoal {
    pub robot: RobotId,
    pub goal_id: u64,
    pub fragment: RouteFragment,
}

/// Completion report from the execution channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub robot: RobotId,
    pub goal_id: u64,
    pub success: bool,
}

/// Per-robot coordination state.
#[derive(Debug, Clone)]
pub struct Robot {
    pub id: RobotId,
    pub lifecycle: Lifecycle,
    pub position: Position,

    pub task: Option<TaskId>,
    pub stage: Option<TaskStage>,
    pub stage_started: Instant,

    /// Full planned route for this planning cycle.
    pub route: Route,
    /// Route cut into clearance windows; only the first one is issued.
    pub fragments: Vec<RouteFragment>,
    /// The goal currently being executed, if any.
    pub issued: Option<FragmentGoal>,
    /// Report for `issued`, waiting for the next tick.
    pub report: Option<ExecutionReport>,
    last_goal_id: u64,

    pub base_node: NodeId,
    pub wait_node: Option<NodeId>,
    pub max_task_priority: Priority,

    pub load_confirmed: bool,
    pub unload_confirmed: bool,
}

impl Robot {
    pub fn new(id: impl Into<RobotId>, config: &RobotConfig, now: Instant) -> Self {
        let position = match config.initial_node {
            Some(ref node) => Position::at(node.clone()),
            None => Position::default(),
        };
        Self {
            id: id.into(),
            lifecycle: Lifecycle::Idle,
            position,
            task: None,
            stage: None,
            stage_started: now,
            route: Route::default(),
            fragments: Vec::new(),
            issued: None,
            report: None,
            last_goal_id: 0,
            base_node: config.base_node.clone(),
            wait_node: config.wait_node.clone(),
            max_task_priority: config.max_task_priority,
            load_confirmed: false,
            unload_confirmed: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.lifecycle == Lifecycle::Idle
    }

    pub fn is_active(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Active { .. })
    }

    pub fn is_moving(&self) -> bool {
        self.lifecycle == Lifecycle::Active { moving: true }
    }

    /// No-op for idle robots.
    pub fn set_moving(&mut self, moving: bool) {
        if self.is_active() {
            self.lifecycle = Lifecycle::Active { moving };
        }
    }

    pub fn accepts(&self, priority: Priority) -> bool {
        priority <= self.max_task_priority
    }

    pub fn is_at(&self, node: &str) -> bool {
        self.position.best_known() == Some(node)
    }

    /// Idle -> active with a freshly bound task.
    pub fn activate(&mut self, task: TaskId, now: Instant) {
        self.lifecycle = Lifecycle::Active { moving: false };
        self.task = Some(task);
        self.enter_stage(TaskStage::FIRST, now);
    }

    pub fn enter_stage(&mut self, stage: TaskStage, now: Instant) {
        self.stage = Some(stage);
        self.stage_started = now;
        match stage {
            TaskStage::WaitLoading => self.load_confirmed = false,
            TaskStage::WaitUnloading => self.unload_confirmed = false,
            _ => {}
        }
    }

    /// Back to the idle pool: no task, no stage, nothing issued.
    pub fn make_idle(&mut self) {
        self.lifecycle = Lifecycle::Idle;
        self.task = None;
        self.stage = None;
        self.issued = None;
        self.report = None;
        self.clear_plan();
    }

    pub fn clear_plan(&mut self) {
        self.route = Route::default();
        self.fragments.clear();
    }

    pub fn next_goal_id(&mut self) -> u64 {
        self.last_goal_id += 1;
        self.last_goal_id
    }

    /// The issued goal finished (or was dropped); the robot is standing.
    pub fn finish_goal(&mut self) {
        self.issued = None;
        self.report = None;
        self.set_moving(false);
    }

    /// Store a report if it belongs to the goal being executed.
    ///
    /// Returns `false` for stale reports.
    pub fn accept_report(&mut self, report: ExecutionReport) -> bool {
        match self.issued {
            Some(ref goal) if goal.goal_id == report.goal_id => {
                self.report = Some(report);
                true
            }
            _ => false,
        }
    }
}

