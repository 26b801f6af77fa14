//! Working-set collections for the tasks and columns of one board.

use super::{Status, StatusId, Task, TaskId};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Display order of two tasks in the same column.
///
/// Ties on rank fall back to creation time and then identifier so every
/// projection of the same set is identical.
#[must_use]
pub fn compare_task_rank(left: &Task, right: &Task) -> Ordering {
    left.position()
        .cmp_rank(right.position())
        .then_with(|| left.created_at().cmp(&right.created_at()))
        .then_with(|| left.id().cmp(&right.id()))
}

/// Display order of two columns on the board.
#[must_use]
pub fn compare_status_rank(left: &Status, right: &Status) -> Ordering {
    left.position()
        .cmp_rank(right.position())
        .then_with(|| left.created_at().cmp(&right.created_at()))
        .then_with(|| left.id().cmp(&right.id()))
}

/// Task working set, including the flags of edits the server never confirmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSet {
    tasks: HashMap<TaskId, Task>,
    dirty: BTreeSet<TaskId>,
}

impl TaskSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clean set from server tasks.
    #[must_use]
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|task| (task.id(), task)).collect(),
            dirty: BTreeSet::new(),
        }
    }

    /// Returns the task with the given identifier.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Returns `true` when the task is part of the set.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Number of tasks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` when the set holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over the tasks in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Returns `true` when a local edit of the task was not confirmed.
    #[must_use]
    pub fn is_dirty(&self, id: TaskId) -> bool {
        self.dirty.contains(&id)
    }

    /// Identifiers of tasks carrying unconfirmed edits.
    pub fn dirty_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.dirty.iter().copied()
    }

    /// Tasks of one column in display order.
    #[must_use]
    pub fn column(&self, status_id: StatusId) -> Vec<&Task> {
        let mut column: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| task.status_id() == status_id)
            .collect();
        column.sort_by(|left, right| compare_task_rank(left, right));
        column
    }

    /// Number of tasks referencing the column.
    #[must_use]
    pub fn count_in(&self, status_id: StatusId) -> usize {
        self.tasks
            .values()
            .filter(|task| task.status_id() == status_id)
            .count()
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id(), task)
    }

    pub(crate) fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.dirty.remove(&id);
        self.tasks.remove(&id)
    }

    pub(crate) fn mark_dirty(&mut self, id: TaskId) {
        if self.tasks.contains_key(&id) {
            self.dirty.insert(id);
        }
    }

    pub(crate) fn clear_dirty(&mut self, id: TaskId) {
        self.dirty.remove(&id);
    }

    /// Copies the entry for `id`, dirty flag included, from `snapshot`.
    pub(crate) fn restore_entry(&mut self, id: TaskId, snapshot: &Self) {
        self.tasks.remove(&id);
        if let Some(task) = snapshot.get(id) {
            self.tasks.insert(id, task.clone());
        }
        if snapshot.is_dirty(id) {
            self.dirty.insert(id);
        } else {
            self.dirty.remove(&id);
        }
    }
}

/// Column working set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSet {
    statuses: HashMap<StatusId, Status>,
}

impl StatusSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from server columns.
    #[must_use]
    pub fn from_statuses(statuses: impl IntoIterator<Item = Status>) -> Self {
        Self {
            statuses: statuses
                .into_iter()
                .map(|status| (status.id(), status))
                .collect(),
        }
    }

    /// Returns the column with the given identifier.
    #[must_use]
    pub fn get(&self, id: StatusId) -> Option<&Status> {
        self.statuses.get(&id)
    }

    /// Returns `true` when the column is part of the set.
    #[must_use]
    pub fn contains(&self, id: StatusId) -> bool {
        self.statuses.contains_key(&id)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns `true` when the board has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Columns in board order.
    #[must_use]
    pub fn ordered(&self) -> Vec<&Status> {
        let mut ordered: Vec<&Status> = self.statuses.values().collect();
        ordered.sort_by(|left, right| compare_status_rank(left, right));
        ordered
    }

    pub(crate) fn insert(&mut self, status: Status) -> Option<Status> {
        self.statuses.insert(status.id(), status)
    }

    pub(crate) fn remove(&mut self, id: StatusId) -> Option<Status> {
        self.statuses.remove(&id)
    }
}
