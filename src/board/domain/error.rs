//! Error types for board domain validation and parsing.

use super::{ProjectId, StatusId, TaskId};
use thiserror::Error;

/// Validation failures raised before any request reaches the server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardValidationError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The status name is empty after trimming.
    #[error("status name must not be empty")]
    EmptyStatusName,

    /// The status color is not a `#RRGGBB` hex value.
    #[error("invalid status color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    /// The position value is not a finite number.
    #[error("invalid position {0}, expected a finite number")]
    InvalidPosition(String),

    /// An update carried no fields.
    #[error("patch must change at least one field")]
    EmptyPatch,

    /// An assignment carried no members.
    #[error("assignment must name at least one member")]
    EmptyAssignees,

    /// No project board is loaded.
    #[error("no project board is loaded")]
    NoProjectLoaded,

    /// The request targets a project other than the loaded one.
    #[error("project {requested} is not loaded (loaded project: {loaded})")]
    ProjectMismatch {
        /// Project currently loaded.
        loaded: ProjectId,
        /// Project named by the request.
        requested: ProjectId,
    },

    /// The task is not part of the loaded board.
    #[error("task {0} is not on the loaded board")]
    UnknownTask(TaskId),

    /// The status is not part of the loaded board.
    #[error("status {0} is not on the loaded board")]
    UnknownStatus(StatusId),

    /// Deleting the status would leave the project without columns.
    #[error("status {0} is the last status of its project and cannot be deleted")]
    LastStatus(StatusId),

    /// The status still owns tasks and no migration target was supplied.
    #[error("status {status_id} still owns {task_count} task(s); a migration target is required")]
    StatusNotEmpty {
        /// Status requested for deletion.
        status_id: StatusId,
        /// Number of tasks still referencing the status.
        task_count: usize,
    },

    /// The migration target cannot receive the tasks.
    #[error("status {0} is not a valid migration target")]
    InvalidMigrationTarget(StatusId),

    /// A drag gesture is already in progress for the task.
    #[error("task {0} is already being dragged")]
    DragInProgress(TaskId),
}

/// Error returned while parsing priorities from the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParsePriorityError(pub String);
