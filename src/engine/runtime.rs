// src/engine/runtime.rs

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use crate::errors::Result;
use crate::exec::{ExecutionBackend, ExecutionRequest};
use crate::types::TaskUpdate;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the coordination core in response to `RuntimeEvent`s and a fixed
/// tick, and delegates fragment execution to an `ExecutionBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// coordination semantics. This struct handles async IO: reading events
/// from channels, answering requests, dispatching goals and publishing
/// task notifications.
pub struct Runtime<E: ExecutionBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: E,
    updates: broadcast::Sender<TaskUpdate>,
    tick_interval: Duration,
}

impl<E: ExecutionBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutionBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: E,
        updates: broadcast::Sender<TaskUpdate>,
    ) -> Self {
        let tick_interval = core.config().tick_interval();
        Self {
            core,
            event_rx,
            backend,
            updates,
            tick_interval,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`; queued events always go
    ///   before the next tick.
    /// - Ticks the core at the configured rate.
    /// - Executes commands returned by the core (dispatch, cancel, publish).
    ///
    /// Returns an error only when the core detects corrupted state.
    pub async fn run(mut self) -> Result<()> {
        info!(tick = ?self.tick_interval, "fleetcoord runtime started");

        let mut ticker = time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let step = tokio::select! {
                biased;

                event = self.event_rx.recv() => match event {
                    Some(event) => {
                        trace!(?event, "runtime received event");
                        self.handle_event(event)?
                    }
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },

                _ = ticker.tick() => match self.core.tick(Instant::now()) {
                    Ok(step) => step,
                    Err(err) => {
                        error!(error = %err, "coordination halted");
                        return Err(err);
                    }
                },
            };

            self.execute_commands(step.commands).await?;

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Feed one event into the core, answering request/response events on
    /// their reply channel.
    fn handle_event(&mut self, event: RuntimeEvent) -> Result<CoreStep> {
        let now = Instant::now();
        match event {
            RuntimeEvent::Fleet(event) => return self.core.handle_event(event, now),
            RuntimeEvent::SubmitTask { request, reply } => {
                let _ = reply.send(self.core.submit_task(request));
            }
            RuntimeEvent::CancelTask { task, reply } => {
                let _ = reply.send(self.core.cancel_task(task, now));
            }
            RuntimeEvent::QueryRobot { robot, reply } => {
                let _ = reply.send(self.core.robot_status(&robot));
            }
            RuntimeEvent::QueryTask { task, reply } => {
                let _ = reply.send(self.core.task_status(task));
            }
            RuntimeEvent::QueryTasks { reply } => {
                let _ = reply.send(self.core.snapshot());
            }
            RuntimeEvent::QueryRoute { robot, reply } => {
                let _ = reply.send(self.core.robot_route(&robot));
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                return Ok(self.core.shutdown());
            }
        }
        Ok(self.core.flush())
    }

    /// Execute the commands of one core step.
    async fn execute_commands(&mut self, commands: Vec<CoreCommand>) -> Result<()> {
        let mut requests = Vec::new();
        for command in commands {
            match command {
                CoreCommand::Dispatch(goal) => requests.push(ExecutionRequest::Goal(goal)),
                CoreCommand::Cancel { robot } => requests.push(ExecutionRequest::Cancel(robot)),
                CoreCommand::Publish(update) => self.publish(update),
            }
        }

        if requests.is_empty() {
            return Ok(());
        }
        let robots: Vec<_> = requests.iter().map(|r| r.robot()).collect();
        debug!(?robots, "forwarding execution requests");

        self.backend.execute(requests).await
    }

    fn publish(&self, update: TaskUpdate) {
        info!(
            task = update.task_id,
            robot = ?update.robot_id,
            state = %update.state,
            "task update"
        );
        if self.updates.send(update).is_err() {
            trace!("no notification subscribers");
        }
    }
}
