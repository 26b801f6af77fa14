//! Pure projection of the working set into ordered columns.

use crate::board::domain::{
    MemberId, Position, Priority, ProjectId, Status, StatusId, StatusSet, Task, TaskId, TaskSet,
};
use std::collections::BTreeSet;

/// Derives board snapshots and column orderings from the working set.
///
/// The view holds no state; every call recomputes from the collections it is
/// given.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardView;

impl BoardView {
    /// Projects the working set into ordered columns.
    ///
    /// Tasks referencing a column that is not loaded are reported as
    /// unplaced rather than dropped.
    #[must_use]
    pub fn project(
        project_id: Option<ProjectId>,
        revision: u64,
        tasks: &TaskSet,
        statuses: &StatusSet,
    ) -> BoardSnapshot {
        let columns = statuses
            .ordered()
            .into_iter()
            .map(|status| BoardColumn {
                status: status.clone(),
                tasks: tasks.column(status.id()).into_iter().cloned().collect(),
            })
            .collect();

        let mut unplaced: Vec<Task> = tasks
            .iter()
            .filter(|task| !statuses.contains(task.status_id()))
            .cloned()
            .collect();
        unplaced.sort_by_key(Task::id);

        BoardSnapshot {
            project_id,
            revision,
            columns,
            unplaced,
            dirty: tasks.dirty_ids().collect(),
        }
    }

    /// Ranks of one column in display order, optionally leaving one task out.
    #[must_use]
    pub fn column_ranks(
        tasks: &TaskSet,
        status_id: StatusId,
        excluding: Option<TaskId>,
    ) -> Vec<(TaskId, Position)> {
        tasks
            .column(status_id)
            .into_iter()
            .filter(|task| Some(task.id()) != excluding)
            .map(|task| (task.id(), task.position()))
            .collect()
    }

    /// Column and index currently occupied by a task.
    #[must_use]
    pub fn locate(tasks: &TaskSet, task_id: TaskId) -> Option<(StatusId, usize)> {
        let status_id = tasks.get(task_id)?.status_id();
        tasks
            .column(status_id)
            .iter()
            .position(|task| task.id() == task_id)
            .map(|index| (status_id, index))
    }
}

/// One column of a projected board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    status: Status,
    tasks: Vec<Task>,
}

impl BoardColumn {
    /// Returns the column.
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Returns the tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns the task identifiers in display order.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(Task::id).collect()
    }
}

/// Immutable projection handed to subscribers after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    project_id: Option<ProjectId>,
    revision: u64,
    columns: Vec<BoardColumn>,
    unplaced: Vec<Task>,
    dirty: BTreeSet<TaskId>,
}

impl BoardSnapshot {
    /// Returns the loaded project, if any.
    #[must_use]
    pub const fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    /// Monotonic counter of applied mutations.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Columns in board order with their tasks.
    #[must_use]
    pub fn columns(&self) -> &[BoardColumn] {
        &self.columns
    }

    /// Columns in board order.
    #[must_use]
    pub fn statuses_ordered(&self) -> Vec<&Status> {
        self.columns.iter().map(BoardColumn::status).collect()
    }

    /// Tasks grouped by column, in board order.
    pub fn tasks_by_column(&self) -> impl Iterator<Item = (StatusId, &[Task])> {
        self.columns
            .iter()
            .map(|column| (column.status.id(), column.tasks.as_slice()))
    }

    /// Returns one column.
    #[must_use]
    pub fn column(&self, status_id: StatusId) -> Option<&BoardColumn> {
        self.columns
            .iter()
            .find(|column| column.status.id() == status_id)
    }

    /// Task identifiers of one column, empty when the column is unknown.
    #[must_use]
    pub fn task_ids(&self, status_id: StatusId) -> Vec<TaskId> {
        self.column(status_id)
            .map(BoardColumn::task_ids)
            .unwrap_or_default()
    }

    /// Column and index of a task.
    #[must_use]
    pub fn locate(&self, task_id: TaskId) -> Option<(StatusId, usize)> {
        self.columns.iter().find_map(|column| {
            column
                .tasks
                .iter()
                .position(|task| task.id() == task_id)
                .map(|index| (column.status.id(), index))
        })
    }

    /// Tasks whose column is not loaded.
    #[must_use]
    pub fn unplaced(&self) -> &[Task] {
        &self.unplaced
    }

    /// Returns `true` when the task carries an unconfirmed edit.
    #[must_use]
    pub fn is_dirty(&self, task_id: TaskId) -> bool {
        self.dirty.contains(&task_id)
    }

    /// Copy of the snapshot keeping only tasks accepted by `filter`.
    ///
    /// Columns are kept even when they end up empty.
    #[must_use]
    pub fn filtered(&self, filter: &BoardFilter) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| BoardColumn {
                status: column.status.clone(),
                tasks: column
                    .tasks
                    .iter()
                    .filter(|task| filter.matches(task))
                    .cloned()
                    .collect(),
            })
            .collect();
        Self {
            project_id: self.project_id,
            revision: self.revision,
            columns,
            unplaced: self
                .unplaced
                .iter()
                .filter(|task| filter.matches(task))
                .cloned()
                .collect(),
            dirty: self.dirty.clone(),
        }
    }
}

/// Presentation filter over a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardFilter {
    assignee: Option<MemberId>,
    priorities: BTreeSet<Priority>,
    text: Option<String>,
}

impl BoardFilter {
    /// Creates a filter accepting every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps tasks assigned to the member.
    #[must_use]
    pub const fn with_assignee(mut self, member_id: MemberId) -> Self {
        self.assignee = Some(member_id);
        self
    }

    /// Keeps tasks with one of the priorities.
    #[must_use]
    pub fn with_priorities(mut self, priorities: impl IntoIterator<Item = Priority>) -> Self {
        self.priorities = priorities.into_iter().collect();
        self
    }

    /// Keeps tasks whose title or description contains the text,
    /// case-insensitively.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let needle = text.into().trim().to_lowercase();
        self.text = (!needle.is_empty()).then_some(needle);
        self
    }

    /// Returns `true` when the task passes every configured criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        let assignee_ok = self
            .assignee
            .is_none_or(|member| task.assignees().contains(&member));
        let priority_ok = self.priorities.is_empty() || self.priorities.contains(&task.priority());
        let text_ok = self.text.as_deref().is_none_or(|needle| {
            task.title().to_lowercase().contains(needle)
                || task
                    .description()
                    .is_some_and(|description| description.to_lowercase().contains(needle))
        });
        assignee_ok && priority_ok && text_ok
    }
}
