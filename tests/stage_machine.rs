// tests/stage_machine.rs

use fleetcoord::coord::{transition, StageEvent, TaskStage, Transition};
use fleetcoord::types::TaskState;

const ALL_STAGES: [TaskStage; 5] = [
    TaskStage::GoToPicker,
    TaskStage::WaitLoading,
    TaskStage::GoToStorage,
    TaskStage::WaitUnloading,
    TaskStage::GoToBase,
];

#[test]
fn test_happy_path_walks_every_stage() {
    let mut stage = TaskStage::FIRST;
    let mut published = Vec::new();

    loop {
        let event = if stage.is_travel() {
            StageEvent::RouteCompleted
        } else {
            StageEvent::Confirmed
        };
        match transition(stage, event) {
            Transition::Advance { next, notify } => {
                published.push(notify);
                stage = next;
            }
            Transition::Finish => break,
            other => panic!("unexpected transition from {stage}: {:?}", other),
        }
    }

    assert_eq!(stage, TaskStage::GoToBase);
    assert_eq!(
        published,
        vec![
            TaskState::Arrived,
            TaskState::Loaded,
            TaskState::Storage,
            TaskState::Delivered
        ]
    );
}

#[test]
fn test_wait_stages_advance_on_timeout() {
    assert_eq!(
        transition(TaskStage::WaitLoading, StageEvent::TimedOut),
        Transition::Advance {
            next: TaskStage::GoToStorage,
            notify: TaskState::Loaded
        }
    );
    assert_eq!(
        transition(TaskStage::WaitUnloading, StageEvent::TimedOut),
        Transition::Advance {
            next: TaskStage::GoToBase,
            notify: TaskState::Delivered
        }
    );
}

#[test]
fn test_failures_depend_on_stage() {
    assert_eq!(
        transition(TaskStage::GoToPicker, StageEvent::ExecutionFailed),
        Transition::Requeue
    );
    assert_eq!(
        transition(TaskStage::GoToStorage, StageEvent::ExecutionFailed),
        Transition::Fail
    );
    assert_eq!(
        transition(TaskStage::WaitLoading, StageEvent::ExecutionFailed),
        Transition::Fail
    );
    assert_eq!(
        transition(TaskStage::GoToBase, StageEvent::ExecutionFailed),
        Transition::RetryBase
    );
}

#[test]
fn test_events_that_do_not_apply_are_ignored() {
    for stage in ALL_STAGES {
        if stage.is_travel() {
            assert_eq!(transition(stage, StageEvent::Confirmed), Transition::Stay);
            assert_eq!(transition(stage, StageEvent::TimedOut), Transition::Stay);
        } else {
            assert_eq!(
                transition(stage, StageEvent::RouteCompleted),
                Transition::Stay
            );
        }
    }
}

#[test]
fn test_stage_order_and_labels() {
    let labels: Vec<_> = ALL_STAGES.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        labels,
        vec![
            "go_to_picker",
            "wait_loading",
            "go_to_storage",
            "wait_unloading",
            "go_to_base"
        ]
    );

    for pair in ALL_STAGES.windows(2) {
        assert_eq!(pair[0].next(), Some(pair[1]));
    }
    assert_eq!(TaskStage::GoToBase.next(), None);
    assert_eq!(
        ALL_STAGES.iter().filter(|s| s.is_wait()).count(),
        2
    );
}

#[test]
fn test_task_state_names_round_trip() {
    for state in [
        TaskState::Accept,
        TaskState::Arrived,
        TaskState::Loaded,
        TaskState::Storage,
        TaskState::Delivered,
        TaskState::Called,
        TaskState::Cancelled,
        TaskState::Failed,
        TaskState::Completed,
    ] {
        assert_eq!(state.as_str().parse::<TaskState>(), Ok(state));
    }
    assert_eq!("accept".parse::<TaskState>(), Ok(TaskState::Accept));
    assert!("LOST".parse::<TaskState>().is_err());
}
