//! Remote board collaborator port.

use crate::board::domain::{
    MemberId, NewStatus, NewTask, Position, ProjectId, Status, StatusId, StatusPatch, Task,
    TaskId, TaskPatch,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Move confirmation sent to the server after the optimistic placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveTaskRequest {
    /// Task being moved.
    pub task_id: TaskId,
    /// Destination column.
    pub status_id: StatusId,
    /// Client-computed rank in the destination column.
    pub position: Position,
    /// Index in the destination column, excluding the moved task.
    pub index: usize,
}

/// Server-side task and column operations consumed by the registries.
#[async_trait]
pub trait BoardGateway: Send + Sync {
    /// Returns every task of the project.
    async fn fetch_tasks(&self, project_id: ProjectId) -> GatewayResult<Vec<Task>>;

    /// Creates a task and returns the canonical record.
    async fn create_task(&self, project_id: ProjectId, draft: &NewTask) -> GatewayResult<Task>;

    /// Applies a partial edit and returns the canonical record.
    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> GatewayResult<Task>;

    /// Moves a task to a column and rank.
    ///
    /// Servers may acknowledge without a body; `Some` carries the canonical
    /// record after any server-side renumbering.
    async fn move_task(&self, request: &MoveTaskRequest) -> GatewayResult<Option<Task>>;

    /// Deletes a task.
    async fn delete_task(&self, task_id: TaskId) -> GatewayResult<()>;

    /// Adds members to a task and returns the canonical record.
    async fn assign_task(&self, task_id: TaskId, members: &[MemberId]) -> GatewayResult<Task>;

    /// Removes members from a task and returns the canonical record.
    async fn unassign_task(&self, task_id: TaskId, members: &[MemberId]) -> GatewayResult<Task>;

    /// Returns every column of the project.
    async fn fetch_statuses(&self, project_id: ProjectId) -> GatewayResult<Vec<Status>>;

    /// Creates a column and returns the canonical record.
    async fn create_status(
        &self,
        project_id: ProjectId,
        draft: &NewStatus,
    ) -> GatewayResult<Status>;

    /// Applies a partial edit to a column and returns the canonical record.
    async fn update_status(
        &self,
        status_id: StatusId,
        patch: &StatusPatch,
    ) -> GatewayResult<Status>;

    /// Deletes a column.
    ///
    /// When `migrate_to` is set the server reassigns every task of the column
    /// to the target before removing the row, in one atomic operation.
    async fn delete_status(
        &self,
        status_id: StatusId,
        migrate_to: Option<StatusId>,
    ) -> GatewayResult<()>;
}

/// Kind of entity named by a [`GatewayError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A project.
    Project,
    /// A task.
    Task,
    /// A status column.
    Status,
    /// A generation batch.
    Batch,
}

impl EntityKind {
    /// Returns the lowercase entity name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Task => "task",
            Self::Status => "status",
            Self::Batch => "generation batch",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The entity no longer exists on the server.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of missing entity.
        entity: EntityKind,
        /// Identifier as sent.
        id: String,
    },

    /// The server refused the change.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The caller may not perform the change.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// No response arrived within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Creates a not-found error.
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` when the server answered and refused the request.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Rejected(_) | Self::Forbidden(_)
        )
    }
}
