// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`FleetEvent`]s, requests and ticks, and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending fragment goals to the execution backend
//! - publishing task notifications
//! - handling Ctrl+C / shutdown
//!
//! Time is passed in explicitly, so the core can be driven from tests
//! without any Tokio, channels or real robots.

use std::mem;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::FleetConfig;
use crate::engine::event_handlers::{
    cancel_task, check_bindings, handle_fleet_event, handle_tasks, replan_and_dispatch,
    run_assignment, CoordState, CoreCommand, CoreStep,
};
use crate::engine::query::{self, RobotStatus, TaskStatus};
use crate::engine::{FleetEvent, RuntimeOptions};
use crate::errors::{CoordError, Result};
use crate::fleet::FleetStore;
use crate::map::{RoutePose, TopoMap};
use crate::tasks::{CancelOutcome, TaskQueue, TaskRequest, TaskSnapshot};
use crate::types::TaskId;

/// Pure core runtime state.
///
/// This owns:
/// - the immutable fleet configuration
/// - the map snapshot, fleet store and task queue
/// - runtime options (e.g. `exit_when_idle`)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    config: FleetConfig,
    state: CoordState,
    options: RuntimeOptions,
    /// Commands produced by synchronous requests, flushed with the next step.
    outbox: Vec<CoreCommand>,
}

impl CoreRuntime {
    pub fn new(config: FleetConfig, map: TopoMap, options: RuntimeOptions, now: Instant) -> Self {
        let fleet = FleetStore::from_config(&config, now);
        let queue = TaskQueue::new(config.coordinator.queue_capacity);
        Self {
            config,
            state: CoordState {
                fleet,
                queue,
                map,
                replan: true,
            },
            options,
            outbox: Vec::new(),
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn fleet(&self) -> &FleetStore {
        &self.state.fleet
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.state.queue
    }

    pub fn map(&self) -> &TopoMap {
        &self.state.map
    }

    /// Whether a replan is scheduled for the next tick (for tests).
    pub fn replan_pending(&self) -> bool {
        self.state.replan
    }

    /// No pending or processing task and every robot idle.
    pub fn is_idle(&self) -> bool {
        !self.state.queue.has_pending()
            && self.state.queue.processing_len() == 0
            && self.state.fleet.all_idle()
    }

    /// Apply a producer event.
    pub fn handle_event(&mut self, event: FleetEvent, now: Instant) -> Result<CoreStep> {
        let mut commands = mem::take(&mut self.outbox);
        handle_fleet_event(&mut self.state, event, now, &mut commands)?;
        Ok(CoreStep::running(commands))
    }

    /// Admit a task. The origin must be a node of the current map.
    pub fn submit_task(&mut self, request: TaskRequest) -> Result<TaskId> {
        if !self.state.map.contains(&request.origin) {
            return Err(CoordError::MapError(format!(
                "task origin '{}' is not on the map",
                request.origin
            )));
        }
        let priority = request.priority;
        let origin = request.origin.clone();
        let id = self.state.queue.submit(request)?;
        info!(task = id, priority, origin = %origin, "task submitted");
        Ok(id)
    }

    /// Cancel a task. Resulting commands are queued for the next step.
    pub fn cancel_task(&mut self, task: TaskId, now: Instant) -> Result<CancelOutcome> {
        cancel_task(&mut self.state, task, now, &mut self.outbox)
    }

    pub fn robot_status(&self, robot: &str) -> Result<RobotStatus> {
        query::robot_status(&self.state, self.config.storage_node(), robot)
    }

    pub fn task_status(&self, task: TaskId) -> Result<TaskStatus> {
        query::task_status(&self.state, task)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.state.queue.snapshot()
    }

    pub fn robot_route(&self, robot: &str) -> Result<Vec<RoutePose>> {
        query::robot_route(&self.state, robot)
    }

    /// Hand out commands queued by synchronous requests.
    pub fn flush(&mut self) -> CoreStep {
        CoreStep::running(mem::take(&mut self.outbox))
    }

    /// One coordination cycle:
    /// 1. assignment, if idle robots and pending tasks both exist;
    /// 2. stage machines against reports, tray signals and timeouts;
    /// 3. planning, critical sections and dispatch, if a replan is due.
    ///
    /// Fails only with [`CoordError::InconsistentAssignment`] or another
    /// invariant violation; the runtime must stop in that case.
    pub fn tick(&mut self, now: Instant) -> Result<CoreStep> {
        let mut commands = mem::take(&mut self.outbox);

        if self.state.fleet.has_idle() && self.state.queue.has_pending() {
            run_assignment(&mut self.state, now, &mut commands)?;
        }

        handle_tasks(&mut self.state, &self.config, now, &mut commands)?;

        if self.state.replan {
            replan_and_dispatch(&mut self.state, &self.config, now, &mut commands)?;
        }

        check_bindings(&self.state)?;

        if !commands.is_empty() {
            debug!(commands = commands.len(), "tick produced commands");
        }

        let keep_running = !(self.options.exit_when_idle && self.is_idle());
        Ok(CoreStep {
            commands,
            keep_running,
        })
    }

    /// Stop every robot that is executing a goal and ask the shell to exit.
    pub fn shutdown(&mut self) -> CoreStep {
        let mut commands = mem::take(&mut self.outbox);
        for robot in self.state.fleet.robots_mut() {
            if robot.issued.is_some() || robot.is_moving() {
                commands.push(CoreCommand::Cancel {
                    robot: robot.id.clone(),
                });
                robot.finish_goal();
            }
        }
        info!(cancelled = commands.len(), "shutting down coordination");
        CoreStep {
            commands,
            keep_running: false,
        }
    }
}
