// tests/assignment.rs

use std::time::Instant;

use fleetcoord::coord::{assign_tasks, find_closest_robot, Assignment, TaskStage};
use fleetcoord::fleet::FleetStore;
use fleetcoord::map::{AvailableMap, TopoMap};
use fleetcoord::tasks::{TaskBucket, TaskQueue, TaskRequest};
use fleetcoord_test_utils::builders::{FleetConfigBuilder, MapBuilder, RobotConfigBuilder};

/// R1 waits at N1 (4 to N3, 2 to N7), R2 at N2 (1 to N3, 6 to N7).
fn two_pickers_map() -> TopoMap {
    MapBuilder::new()
        .nodes(&["N1", "N2", "N3", "N7"])
        .edge("N1", "N3", 4.0)
        .edge("N1", "N7", 2.0)
        .edge("N2", "N3", 1.0)
        .edge("N2", "N7", 6.0)
        .build()
}

fn fleet(robots: &[(&str, &str, u32)]) -> FleetStore {
    let mut builder = FleetConfigBuilder::new("N3");
    for (id, node, max_priority) in robots {
        builder = builder.with_robot(
            id,
            RobotConfigBuilder::new(node)
                .at(node)
                .max_task_priority(*max_priority)
                .build(),
        );
    }
    FleetStore::from_config(&builder.build(), Instant::now())
}

fn assignment(task: u64, robot: &str) -> Assignment {
    Assignment {
        task,
        robot: robot.to_string(),
    }
}

#[test]
fn test_highest_priority_task_picks_first() {
    let map = two_pickers_map();
    let mut fleet = fleet(&[("R1", "N1", u32::MAX), ("R2", "N2", u32::MAX)]);
    let mut queue = TaskQueue::new(10);
    queue.submit(TaskRequest::new(2, "N3")).unwrap();
    queue.submit(TaskRequest::new(5, "N7")).unwrap();

    let assigned = assign_tasks(&mut fleet, &mut queue, &map, Instant::now()).unwrap();

    assert_eq!(assigned, vec![assignment(2, "R1"), assignment(1, "R2")]);
    assert_eq!(
        queue.get(2).unwrap().bucket,
        TaskBucket::Processing {
            robot: "R1".to_string()
        }
    );

    let r2 = fleet.robot("R2").unwrap();
    assert!(r2.is_active());
    assert_eq!(r2.task, Some(1));
    assert_eq!(r2.stage, Some(TaskStage::GoToPicker));
    assert!(!queue.has_pending());
}

#[test]
fn test_priority_threshold_leaves_task_pending() {
    let map = two_pickers_map();
    let mut fleet = fleet(&[("R1", "N1", 3), ("R2", "N2", 3)]);
    let mut queue = TaskQueue::new(10);
    let urgent = queue.submit(TaskRequest::new(5, "N7")).unwrap();
    let normal = queue.submit(TaskRequest::new(1, "N7")).unwrap();

    let assigned = assign_tasks(&mut fleet, &mut queue, &map, Instant::now()).unwrap();

    assert_eq!(assigned, vec![assignment(normal, "R1")]);
    assert_eq!(queue.snapshot().pending_ids(), vec![urgent]);
    assert!(fleet.robot("R2").unwrap().is_idle());
}

#[test]
fn test_equal_distance_goes_to_lowest_robot_id() {
    let map = MapBuilder::new()
        .nodes(&["A", "B", "P"])
        .edge("A", "P", 3.0)
        .edge("B", "P", 3.0)
        .build();
    let fleet = fleet(&[("r2", "B", u32::MAX), ("r1", "A", u32::MAX)]);
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(TaskRequest::new(1, "P")).unwrap();

    let view = AvailableMap::from_occupied(fleet.occupied_nodes());
    let task = queue.task(id).unwrap();

    let (robot, distance) = find_closest_robot(&fleet, &map, &view, task).unwrap();
    assert_eq!(robot, "r1");
    assert_eq!(distance, 3.0);
}

#[test]
fn test_unreachable_origin_stays_pending() {
    let map = MapBuilder::new()
        .nodes(&["A", "P", "Q"])
        .edge("A", "P", 1.0)
        .build();
    let mut fleet = fleet(&[("r1", "A", u32::MAX)]);
    let mut queue = TaskQueue::new(10);
    let stranded = queue.submit(TaskRequest::new(9, "Q")).unwrap();
    let reachable = queue.submit(TaskRequest::new(1, "P")).unwrap();

    let assigned = assign_tasks(&mut fleet, &mut queue, &map, Instant::now()).unwrap();

    assert_eq!(assigned, vec![assignment(reachable, "r1")]);
    assert_eq!(queue.snapshot().pending_ids(), vec![stranded]);
}

#[test]
fn test_routes_avoid_occupied_nodes_but_not_the_origin() {
    // A - M - P, and a longer detour A - D - P.
    let map = MapBuilder::new()
        .nodes(&["A", "M", "D", "P"])
        .link("A", "M", 1.0)
        .link("M", "P", 1.0)
        .link("A", "D", 5.0)
        .link("D", "P", 5.0)
        .build();

    let mut fleet = fleet(&[("r1", "A", u32::MAX), ("r2", "P", u32::MAX)]);
    fleet.set_current_node("r2", Some("M".to_string()));
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(TaskRequest::new(1, "P")).unwrap();

    // r2 sits on M, so r1 has to go around; r2 reaches P in one hop.
    let view = AvailableMap::from_occupied(fleet.occupied_nodes());
    let (robot, distance) =
        find_closest_robot(&fleet, &map, &view, queue.task(id).unwrap()).unwrap();
    assert_eq!(robot, "r2");
    assert_eq!(distance, 1.0);

    // Someone standing on the pick-up node does not hide it.
    fleet.set_current_node("r2", Some("P".to_string()));
    let view = AvailableMap::from_occupied(fleet.occupied_nodes());
    let (robot, distance) =
        find_closest_robot(&fleet, &map, &view, queue.task(id).unwrap()).unwrap();
    assert_eq!(robot, "r2");
    assert_eq!(distance, 0.0);

    fleet.robot_mut("r2").unwrap().activate(99, Instant::now());
    let (robot, distance) =
        find_closest_robot(&fleet, &map, &view, queue.task(id).unwrap()).unwrap();
    assert_eq!(robot, "r1");
    assert_eq!(distance, 2.0);
}

#[test]
fn test_no_idle_robot_means_no_assignment() {
    let map = two_pickers_map();
    let mut fleet = fleet(&[("R1", "N1", u32::MAX)]);
    fleet.robot_mut("R1").unwrap().activate(50, Instant::now());
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(TaskRequest::new(1, "N3")).unwrap();

    let assigned = assign_tasks(&mut fleet, &mut queue, &map, Instant::now()).unwrap();
    assert!(assigned.is_empty());
    assert_eq!(queue.snapshot().pending_ids(), vec![id]);
}
