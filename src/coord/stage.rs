// src/coord/stage.rs

//! Task-stage state machine.
//!
//! `go_to_picker -> wait_loading -> go_to_storage -> wait_unloading ->
//! go_to_base -> (idle)`. Transitions are a pure function of the current
//! stage and one event; applying them to the fleet and the queue is done by
//! the engine.

use std::fmt;

use crate::types::TaskState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStage {
    GoToPicker,
    WaitLoading,
    GoToStorage,
    WaitUnloading,
    GoToBase,
}

impl TaskStage {
    pub const FIRST: TaskStage = TaskStage::GoToPicker;

    pub fn next(self) -> Option<TaskStage> {
        match self {
            TaskStage::GoToPicker => Some(TaskStage::WaitLoading),
            TaskStage::WaitLoading => Some(TaskStage::GoToStorage),
            TaskStage::GoToStorage => Some(TaskStage::WaitUnloading),
            TaskStage::WaitUnloading => Some(TaskStage::GoToBase),
            TaskStage::GoToBase => None,
        }
    }

    /// Stages that end when a route completes.
    pub fn is_travel(self) -> bool {
        matches!(
            self,
            TaskStage::GoToPicker | TaskStage::GoToStorage | TaskStage::GoToBase
        )
    }

    pub fn is_wait(self) -> bool {
        !self.is_travel()
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStage::GoToPicker => "go_to_picker",
            TaskStage::WaitLoading => "wait_loading",
            TaskStage::GoToStorage => "go_to_storage",
            TaskStage::WaitUnloading => "wait_unloading",
            TaskStage::GoToBase => "go_to_base",
        }
    }

    /// Notification published when this stage is left normally.
    fn completion_state(self) -> TaskState {
        match self {
            TaskStage::GoToPicker => TaskState::Arrived,
            TaskStage::WaitLoading => TaskState::Loaded,
            TaskStage::GoToStorage => TaskState::Storage,
            TaskStage::WaitUnloading => TaskState::Delivered,
            TaskStage::GoToBase => TaskState::Completed,
        }
    }
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Something that happened to a robot during its current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// The issued fragment finished and the robot stands on the stage's
    /// destination.
    RouteCompleted,
    /// Tray loaded / unloaded confirmation.
    Confirmed,
    /// The wait stage outlived its timeout.
    TimedOut,
    /// The execution channel reported a failed fragment.
    ExecutionFailed,
}

/// What the engine must do in response to a [`StageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Enter `next` and publish `notify`.
    Advance { next: TaskStage, notify: TaskState },
    /// The robot is home: close the task and return to the idle pool.
    Finish,
    /// Give the task back to the queue (`CALLED`) and send the robot home.
    Requeue,
    /// Terminate the task (`FAILED`) and send the robot home.
    Fail,
    /// Going home failed; try again.
    RetryBase,
    /// The event does not apply to this stage.
    Stay,
}

pub fn transition(stage: TaskStage, event: StageEvent) -> Transition {
    use StageEvent::*;

    match (stage, event) {
        (TaskStage::GoToBase, RouteCompleted) => Transition::Finish,
        (s, RouteCompleted) if s.is_travel() => advance(s),
        (s, Confirmed | TimedOut) if s.is_wait() => advance(s),

        (TaskStage::GoToPicker, ExecutionFailed) => Transition::Requeue,
        (TaskStage::GoToBase, ExecutionFailed) => Transition::RetryBase,
        (_, ExecutionFailed) => Transition::Fail,

        _ => Transition::Stay,
    }
}

fn advance(stage: TaskStage) -> Transition {
    match stage.next() {
        Some(next) => Transition::Advance {
            next,
            notify: stage.completion_state(),
        },
        None => Transition::Finish,
    }
}
