// tests/task_queue.rs

use fleetcoord::errors::CoordError;
use fleetcoord::tasks::{CancelOutcome, TaskBucket, TaskQueue, TaskRequest};

fn request(priority: u32, origin: &str) -> TaskRequest {
    TaskRequest::new(priority, origin)
}

#[test]
fn test_ids_start_at_one_and_increase() {
    let mut queue = TaskQueue::new(10);
    let a = queue.submit(request(1, "N1")).unwrap();
    let b = queue.submit(request(1, "N2")).unwrap();
    let c = queue.submit(request(9, "N3")).unwrap();

    assert_eq!((a, b, c), (1, 2, 3));
    assert_eq!(queue.pending_len(), 3);
}

#[test]
fn test_drain_orders_by_priority_then_id() {
    let mut queue = TaskQueue::new(10);
    queue.submit(request(2, "N3")).unwrap(); // 1
    queue.submit(request(5, "N7")).unwrap(); // 2
    queue.submit(request(2, "N4")).unwrap(); // 3
    queue.submit(request(7, "N5")).unwrap(); // 4

    let order: Vec<u64> = queue.drain_pending().iter().map(|t| t.id).collect();
    assert_eq!(order, vec![4, 2, 1, 3]);
    assert!(!queue.has_pending());

    // Drained tasks are still pending records until bound or handed back.
    queue.requeue([1, 3]);
    assert_eq!(queue.snapshot().pending_ids(), vec![1, 3]);
}

#[test]
fn test_submit_rejects_when_full() {
    let mut queue = TaskQueue::new(2);
    queue.submit(request(1, "A")).unwrap();
    queue.submit(request(1, "B")).unwrap();

    match queue.submit(request(1, "C")) {
        Err(CoordError::QueueFull { capacity }) => assert_eq!(capacity, 2),
        other => panic!("Expected QueueFull, got: {:?}", other),
    }

    // Processing tasks do not count against the pending bound.
    let drained = queue.drain_pending();
    queue.mark_processing(drained[0].id, "r1").unwrap();
    queue.requeue([drained[1].id]);
    assert!(queue.submit(request(1, "C")).is_ok());
}

#[test]
fn test_cancel_pending_removes_from_buffer() {
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(request(3, "A")).unwrap();
    let other = queue.submit(request(1, "B")).unwrap();

    assert_eq!(queue.cancel(id).unwrap(), CancelOutcome::WasPending);

    let snapshot = queue.snapshot();
    assert_eq!(snapshot.pending_ids(), vec![other]);
    assert_eq!(snapshot.cancelled.len(), 1);
    assert_eq!(snapshot.cancelled[0].id, id);
    assert_eq!(snapshot.len(), 2);
}

#[test]
fn test_cancel_processing_reports_robot() {
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(request(1, "A")).unwrap();
    queue.drain_pending();
    queue.mark_processing(id, "r1").unwrap();

    assert_eq!(
        queue.cancel(id).unwrap(),
        CancelOutcome::WasProcessing {
            robot: "r1".to_string()
        }
    );
    assert_eq!(queue.get(id).unwrap().bucket, TaskBucket::Cancelled);
    assert_eq!(queue.processing_len(), 0);
}

#[test]
fn test_cancel_unknown_and_terminal_tasks() {
    let mut queue = TaskQueue::new(10);
    assert!(matches!(queue.cancel(42), Err(CoordError::InvalidTaskId(42))));

    let id = queue.submit(request(1, "A")).unwrap();
    queue.drain_pending();
    queue.mark_processing(id, "r1").unwrap();
    queue.complete(id).unwrap();

    match queue.cancel(id) {
        Err(CoordError::InvalidState { task, state }) => {
            assert_eq!(task, id);
            assert_eq!(state, "completed");
        }
        other => panic!("Expected InvalidState, got: {:?}", other),
    }
}

#[test]
fn test_requeue_task_returns_to_pending_unbound() {
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(request(4, "A")).unwrap();
    queue.drain_pending();
    queue.mark_processing(id, "r1").unwrap();
    assert_eq!(queue.processing().collect::<Vec<_>>(), vec![(id, "r1")]);

    queue.requeue_task(id).unwrap();

    assert_eq!(queue.get(id).unwrap().bucket, TaskBucket::Pending);
    assert_eq!(queue.get(id).unwrap().bucket.robot(), None);
    assert_eq!(queue.snapshot().pending_ids(), vec![id]);
}

#[test]
fn test_only_processing_tasks_complete_or_fail() {
    let mut queue = TaskQueue::new(10);
    let id = queue.submit(request(1, "A")).unwrap();

    assert!(matches!(
        queue.complete(id),
        Err(CoordError::InvalidState { state: "pending", .. })
    ));

    queue.drain_pending();
    queue.mark_processing(id, "r1").unwrap();
    queue.fail(id).unwrap();

    let record = queue.record(id).unwrap();
    assert!(record.bucket.is_terminal());
    assert_eq!(queue.snapshot().failed.len(), 1);
    assert!(matches!(queue.record(99), Err(CoordError::InvalidTaskId(99))));
}

#[test]
fn test_snapshot_partitions_every_bucket() {
    let mut queue = TaskQueue::new(10);
    let done = queue.submit(request(1, "A")).unwrap();
    let busy = queue.submit(request(1, "B")).unwrap();
    let dropped = queue.submit(request(1, "C")).unwrap();
    let broken = queue.submit(request(1, "D")).unwrap();
    let waiting = queue.submit(request(1, "E")).unwrap();

    queue.cancel(dropped).unwrap();
    let drained = queue.drain_pending();
    assert_eq!(drained.len(), 4);
    for (id, robot) in [(done, "r1"), (busy, "r2"), (broken, "r3")] {
        queue.mark_processing(id, robot).unwrap();
    }
    queue.requeue([waiting]);
    queue.complete(done).unwrap();
    queue.fail(broken).unwrap();

    let snapshot = queue.snapshot();
    assert_eq!(snapshot.pending_ids(), vec![waiting]);
    assert_eq!(snapshot.processing.len(), 1);
    assert_eq!(snapshot.processing[0].0.id, busy);
    assert_eq!(snapshot.processing[0].1, "r2");
    assert_eq!(snapshot.completed[0].id, done);
    assert_eq!(snapshot.cancelled[0].id, dropped);
    assert_eq!(snapshot.failed[0].id, broken);
    assert_eq!(snapshot.len(), 5);
}

#[test]
fn test_payload_is_carried() {
    let mut queue = TaskQueue::new(10);
    let id = queue
        .submit(TaskRequest::new(1, "A").with_payload("strawberries"))
        .unwrap();
    assert_eq!(queue.task(id).unwrap().payload, "strawberries");
}
