// src/tasks/queue.rs

//! Priority-ordered pending buffer plus the per-id task records.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use tracing::debug;

use crate::errors::{CoordError, Result};
use crate::tasks::record::{Task, TaskBucket, TaskRecord, TaskRequest, TaskSnapshot};
use crate::types::{Priority, RobotId, TaskId};

/// Heap key: highest priority first, then lowest id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEntry {
    priority: Priority,
    id: TaskId,
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What a successful `cancel` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Dropped from the pending buffer; nothing else to do.
    WasPending,
    /// The task was being executed by `robot`, which must be recalled.
    WasProcessing { robot: RobotId },
}

/// Task Queue.
///
/// Records are never deleted; terminal tasks stay queryable. Capacity only
/// bounds the pending buffer.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    capacity: usize,
    next_id: TaskId,
    pending: BinaryHeap<PendingEntry>,
    records: BTreeMap<TaskId, TaskRecord>,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_id: 1,
            pending: BinaryHeap::new(),
            records: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit a new task. Ids start at 1 and increase monotonically.
    pub fn submit(&mut self, request: TaskRequest) -> Result<TaskId> {
        if self.pending.len() >= self.capacity {
            return Err(CoordError::QueueFull {
                capacity: self.capacity,
            });
        }

        let id = self.next_id;
        self.next_id += 1;

        let task = Task {
            id,
            priority: request.priority,
            origin: request.origin,
            payload: request.payload,
        };
        self.pending.push(PendingEntry {
            priority: task.priority,
            id,
        });
        self.records.insert(
            id,
            TaskRecord {
                task,
                bucket: TaskBucket::Pending,
            },
        );

        debug!(task = id, priority = request.priority, "task admitted");
        Ok(id)
    }

    /// Cancel a pending or processing task.
    ///
    /// Recalling the robot of a processing task is the caller's job.
    pub fn cancel(&mut self, id: TaskId) -> Result<CancelOutcome> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(CoordError::InvalidTaskId(id))?;

        let outcome = match record.bucket {
            TaskBucket::Pending => {
                self.pending.retain(|e| e.id != id);
                CancelOutcome::WasPending
            }
            TaskBucket::Processing { ref robot } => CancelOutcome::WasProcessing {
                robot: robot.clone(),
            },
            ref terminal => {
                return Err(CoordError::InvalidState {
                    task: id,
                    state: terminal.label(),
                });
            }
        };
        record.bucket = TaskBucket::Cancelled;
        Ok(outcome)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn processing_len(&self) -> usize {
        self.processing().count()
    }

    /// Take every pending task out of the buffer, highest priority first and
    /// by ascending id within a priority.
    ///
    /// The records stay `Pending`; hand unmatched ids back with
    /// [`TaskQueue::requeue`].
    pub fn drain_pending(&mut self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.pending.len());
        while let Some(entry) = self.pending.pop() {
            match self.records.get(&entry.id) {
                Some(record) if record.bucket == TaskBucket::Pending => {
                    tasks.push(record.task.clone());
                }
                _ => {}
            }
        }
        tasks
    }

    /// Put drained-but-unassigned tasks back into the buffer.
    pub fn requeue<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = TaskId>,
    {
        for id in ids {
            if let Some(record) = self.records.get(&id) {
                if record.bucket == TaskBucket::Pending {
                    self.pending.push(PendingEntry {
                        priority: record.task.priority,
                        id,
                    });
                }
            }
        }
    }

    /// Pending (drained) -> processing, bound to `robot`.
    pub fn mark_processing(&mut self, id: TaskId, robot: &str) -> Result<()> {
        let record = self.record_mut(id)?;
        if record.bucket != TaskBucket::Pending {
            return Err(CoordError::InvalidState {
                task: id,
                state: record.bucket.label(),
            });
        }
        record.bucket = TaskBucket::Processing {
            robot: robot.to_string(),
        };
        Ok(())
    }

    /// Processing -> pending, unbound. Used when the robot gave up before
    /// reaching the picker. Re-admission ignores the capacity bound.
    pub fn requeue_task(&mut self, id: TaskId) -> Result<()> {
        let record = self.processing_record(id)?;
        record.bucket = TaskBucket::Pending;
        let priority = record.task.priority;
        self.pending.push(PendingEntry { priority, id });
        Ok(())
    }

    pub fn complete(&mut self, id: TaskId) -> Result<()> {
        self.processing_record(id)?.bucket = TaskBucket::Completed;
        Ok(())
    }

    pub fn fail(&mut self, id: TaskId) -> Result<()> {
        self.processing_record(id)?.bucket = TaskBucket::Failed;
        Ok(())
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.records.get(&id)
    }

    pub fn record(&self, id: TaskId) -> Result<&TaskRecord> {
        self.records.get(&id).ok_or(CoordError::InvalidTaskId(id))
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.records.get(&id).map(|r| &r.task)
    }

    /// `(task, robot)` for every processing task.
    pub fn processing(&self) -> impl Iterator<Item = (TaskId, &str)> {
        self.records
            .iter()
            .filter_map(|(id, r)| r.bucket.robot().map(|robot| (*id, robot)))
    }

    /// Non-destructive view of every task by bucket.
    pub fn snapshot(&self) -> TaskSnapshot {
        let mut snapshot = TaskSnapshot::default();

        let mut order = self.pending.clone().into_sorted_vec();
        order.reverse();
        snapshot.pending = order
            .iter()
            .filter_map(|e| self.records.get(&e.id))
            .filter(|r| r.bucket == TaskBucket::Pending)
            .map(|r| r.task.clone())
            .collect();

        for record in self.records.values() {
            let task = record.task.clone();
            match record.bucket {
                TaskBucket::Pending => {}
                TaskBucket::Processing { ref robot } => {
                    snapshot.processing.push((task, robot.clone()))
                }
                TaskBucket::Completed => snapshot.completed.push(task),
                TaskBucket::Cancelled => snapshot.cancelled.push(task),
                TaskBucket::Failed => snapshot.failed.push(task),
            }
        }
        snapshot
    }

    fn record_mut(&mut self, id: TaskId) -> Result<&mut TaskRecord> {
        self.records
            .get_mut(&id)
            .ok_or(CoordError::InvalidTaskId(id))
    }

    fn processing_record(&mut self, id: TaskId) -> Result<&mut TaskRecord> {
        let record = self.record_mut(id)?;
        if matches!(record.bucket, TaskBucket::Processing { .. }) {
            Ok(record)
        } else {
            Err(CoordError::InvalidState {
                task: id,
                state: record.bucket.label(),
            })
        }
    }
}
