//! Task entity and the value objects used to create and edit tasks.

use super::{
    BoardValidationError, MemberId, ParsePriorityError, Position, ProjectId, StatusId, TaskId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Task urgency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default urgency.
    #[default]
    Medium,
    /// Should be picked up soon.
    High,
    /// Needs immediate attention.
    Urgent,
}

impl Priority {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParsePriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParsePriorityError(value.to_owned())),
        }
    }
}

/// Task entity as held on the client board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    title: String,
    description: Option<String>,
    status_id: StatusId,
    priority: Priority,
    position: Position,
    due_date: Option<NaiveDate>,
    completed_at: Option<DateTime<Utc>>,
    assignees: BTreeSet<MemberId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a task returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskData {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Task title.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Column the task belongs to.
    pub status_id: StatusId,
    /// Task urgency.
    pub priority: Priority,
    /// Rank within the column.
    pub position: Position,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Completion timestamp, if completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Assigned project members.
    pub assignees: BTreeSet<MemberId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Reconstructs a task from server data.
    #[must_use]
    pub fn from_data(data: TaskData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            status_id: data.status_id,
            priority: data.priority,
            position: data.position,
            due_date: data.due_date,
            completed_at: data.completed_at,
            assignees: data.assignees,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the status column the task belongs to.
    #[must_use]
    pub const fn status_id(&self) -> StatusId {
        self.status_id
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the rank within the column.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns the completion timestamp, if completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the assigned members.
    #[must_use]
    pub const fn assignees(&self) -> &BTreeSet<MemberId> {
        &self.assignees
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the task to a column and rank.
    pub(crate) const fn place(&mut self, status_id: StatusId, position: Position, at: DateTime<Utc>) {
        self.status_id = status_id;
        self.position = position;
        self.updated_at = at;
    }

    /// Changes the rank without touching the modification timestamp.
    pub(crate) const fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Merges the patch fields into the task.
    pub(crate) fn apply_patch(&mut self, patch: &TaskPatch, at: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        self.updated_at = at;
    }

    /// Adds members to the assignee set.
    pub(crate) fn assign(&mut self, members: &[MemberId], at: DateTime<Utc>) {
        self.assignees.extend(members.iter().copied());
        self.updated_at = at;
    }

    /// Removes members from the assignee set.
    pub(crate) fn unassign(&mut self, members: &[MemberId], at: DateTime<Utc>) {
        for member in members {
            self.assignees.remove(member);
        }
        self.updated_at = at;
    }

    /// Replaces the task with the server's `canonical` record.
    ///
    /// Fields named in `retain` keep their local values because another
    /// unconfirmed write still owns them.
    pub(crate) fn absorb(&mut self, canonical: Self, retain: Retain) {
        let local = std::mem::replace(self, canonical);
        if retain.placement {
            self.status_id = local.status_id;
            self.position = local.position;
        }
        if retain.content {
            self.title = local.title;
            self.description = local.description;
            self.priority = local.priority;
            self.due_date = local.due_date;
            self.completed_at = local.completed_at;
        }
    }
}

/// Local field groups kept when absorbing a canonical task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Retain {
    /// Column and rank.
    pub(crate) placement: bool,
    /// Title, description, priority and dates.
    pub(crate) content: bool,
}

/// Fields for a task to be created by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    title: String,
    description: Option<String>,
    status_id: StatusId,
    priority: Priority,
    due_date: Option<NaiveDate>,
    assignees: BTreeSet<MemberId>,
}

impl NewTask {
    /// Creates a draft with the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, status_id: StatusId) -> Self {
        Self {
            title: title.into(),
            description: None,
            status_id,
            priority: Priority::default(),
            due_date: None,
            assignees: BTreeSet::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the initial assignees.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = MemberId>) -> Self {
        self.assignees = assignees.into_iter().collect();
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the destination column.
    #[must_use]
    pub const fn status_id(&self) -> StatusId {
        self.status_id
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns the initial assignees.
    #[must_use]
    pub const fn assignees(&self) -> &BTreeSet<MemberId> {
        &self.assignees
    }

    /// Checks the draft before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::EmptyTitle`] when the title is blank.
    pub fn validate(&self) -> Result<(), BoardValidationError> {
        if self.title.trim().is_empty() {
            return Err(BoardValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Partial edit of a task.
///
/// Column placement is not editable here; it changes only through moves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    title: Option<String>,
    description: Option<Option<String>>,
    priority: Option<Priority>,
    due_date: Option<Option<NaiveDate>>,
    completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces or clears the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Replaces the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replaces or clears the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Marks the task completed at the given time, or reopens it.
    #[must_use]
    pub const fn with_completed_at(mut self, completed_at: Option<DateTime<Utc>>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    /// Returns the new title, if set.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the description change, if set.
    #[must_use]
    pub const fn description(&self) -> Option<&Option<String>> {
        self.description.as_ref()
    }

    /// Returns the new priority, if set.
    #[must_use]
    pub const fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Returns the due date change, if set.
    #[must_use]
    pub const fn due_date(&self) -> Option<Option<NaiveDate>> {
        self.due_date
    }

    /// Returns the completion change, if set.
    #[must_use]
    pub const fn completed_at(&self) -> Option<Option<DateTime<Utc>>> {
        self.completed_at
    }

    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed_at.is_none()
    }

    /// Checks the patch before it is applied.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::EmptyPatch`] for a patch without
    /// fields, or [`BoardValidationError::EmptyTitle`] for a blank title.
    pub fn validate(&self) -> Result<(), BoardValidationError> {
        if self.is_empty() {
            return Err(BoardValidationError::EmptyPatch);
        }
        if self.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
            return Err(BoardValidationError::EmptyTitle);
        }
        Ok(())
    }
}
