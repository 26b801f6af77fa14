//! Column working set and safe column deletion.

use super::optimistic::within;
use super::store::BoardState;
use super::{BoardConfig, BoardSignal, BoardStore, BoardSyncError, BoardSyncResult, BoardView};
use crate::board::{
    domain::{
        BoardValidationError, NewStatus, Position, PositionSpacing, ProjectId, Status, StatusId,
        StatusPatch, StatusSet, Task, TaskId, append,
    },
    ports::BoardGateway,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns the columns of the loaded project.
///
/// A project always keeps at least one column, and a column that still owns
/// tasks is only deleted together with a migration target. Every column
/// change waits for the server.
pub struct StatusRegistry<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    gateway: Arc<G>,
    clock: Arc<C>,
    store: BoardStore,
    config: BoardConfig,
}

impl<G, C> Clone for StatusRegistry<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            clock: Arc::clone(&self.clock),
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<G, C> StatusRegistry<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    /// Creates a registry over the shared store.
    #[must_use]
    pub const fn new(
        gateway: Arc<G>,
        clock: Arc<C>,
        store: BoardStore,
        config: BoardConfig,
    ) -> Self {
        Self {
            gateway,
            clock,
            store,
            config,
        }
    }

    /// Returns a copy of one column.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn status(&self, status_id: StatusId) -> BoardSyncResult<Option<Status>> {
        self.store
            .read(|state| state.statuses.get(status_id).cloned())
    }

    /// Returns the columns in board order.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn statuses(&self) -> BoardSyncResult<Vec<Status>> {
        self.store
            .read(|state| state.statuses.ordered().into_iter().cloned().collect())
    }

    /// Replaces the columns with the project's columns.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::Fetch`] when the columns cannot be fetched;
    /// the previous columns are kept.
    pub async fn load(&self, project_id: ProjectId) -> BoardSyncResult<usize> {
        let statuses = self.fetch(project_id).await?;
        let count = statuses.len();
        self.store.mutate(|state| {
            state.replace_statuses(project_id, StatusSet::from_statuses(statuses));
            Ok(())
        })?;
        info!(project_id = %project_id, count, "statuses loaded");
        self.store
            .emit(BoardSignal::StatusesLoaded { project_id, count });
        Ok(count)
    }

    pub(crate) async fn fetch(&self, project_id: ProjectId) -> BoardSyncResult<Vec<Status>> {
        within(
            self.config.request_timeout(),
            self.gateway.fetch_statuses(project_id),
        )
        .await
        .map_err(BoardSyncError::fetch)
    }

    /// Creates a column.
    ///
    /// Without an explicit position the column is placed after the last one.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name or a project other than
    /// the loaded one, and a fetch or conflict failure when the server
    /// refuses.
    pub async fn create(&self, project_id: ProjectId, draft: NewStatus) -> BoardSyncResult<Status> {
        draft.validate()?;
        let spacing = self.config.spacing();
        let placed = self.store.read(|state| {
            state.require_project(project_id)?;
            if draft.position().is_some() {
                return Ok(draft);
            }
            let position = trailing_position(&state.statuses, spacing);
            Ok::<_, BoardValidationError>(draft.with_position(position))
        })??;

        let status = within(
            self.config.request_timeout(),
            self.gateway.create_status(project_id, &placed),
        )
        .await?;
        self.absorb(&status)?;
        info!(status_id = %status.id(), name = status.name(), "status created");
        Ok(status)
    }

    /// Edits a column.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty patch or unknown column, and
    /// a fetch or conflict failure when the server refuses.
    pub async fn update(&self, status_id: StatusId, patch: &StatusPatch) -> BoardSyncResult<Status> {
        patch.validate()?;
        self.store.read(|state| {
            if state.statuses.contains(status_id) {
                Ok(())
            } else {
                Err(BoardValidationError::UnknownStatus(status_id))
            }
        })??;

        let status = within(
            self.config.request_timeout(),
            self.gateway.update_status(status_id, patch),
        )
        .await?;
        self.absorb(&status)?;
        Ok(status)
    }

    fn absorb(&self, status: &Status) -> BoardSyncResult<()> {
        self.store.mutate(|state| {
            if state.project_id == Some(status.project_id()) {
                state.statuses.insert(status.clone());
            }
            Ok(())
        })
    }

    /// Deletes a column, moving its tasks to `migrate_to`.
    ///
    /// The server reassigns the tasks and removes the column in one call.
    /// Locally the column disappears and its tasks are appended to the end
    /// of the target column, in their previous order, in a single mutation.
    /// Returns the number of tasks migrated.
    ///
    /// # Errors
    ///
    /// Returns a validation error without contacting the server when the
    /// column is unknown, is the last column of the project, still owns
    /// tasks and no target is given, or the target is the column itself or
    /// not on the board. Returns a fetch or conflict failure when the server
    /// refuses; nothing changes locally in that case.
    pub async fn delete(
        &self,
        status_id: StatusId,
        migrate_to: Option<StatusId>,
    ) -> BoardSyncResult<usize> {
        self.store
            .read(|state| check_deletable(state, status_id, migrate_to))??;

        within(
            self.config.request_timeout(),
            self.gateway.delete_status(status_id, migrate_to),
        )
        .await?;

        let spacing = self.config.spacing();
        let at = self.clock.utc();
        let migrated = self.store.mutate(|state| {
            Ok(remove_and_migrate(state, status_id, migrate_to, spacing, at))
        })?;
        info!(status_id = %status_id, migrated, "status deleted");
        self.store.emit(BoardSignal::StatusDeleted {
            status_id,
            migrated_to: migrate_to,
            migrated,
        });
        Ok(migrated)
    }
}

fn trailing_position(statuses: &StatusSet, spacing: PositionSpacing) -> Position {
    statuses.ordered().last().map_or_else(
        || spacing.initial(),
        |last| {
            let current = last.position();
            spacing.after(current).unwrap_or(current)
        },
    )
}

fn check_deletable(
    state: &BoardState,
    status_id: StatusId,
    migrate_to: Option<StatusId>,
) -> Result<(), BoardValidationError> {
    if state.project_id.is_none() {
        return Err(BoardValidationError::NoProjectLoaded);
    }
    if !state.statuses.contains(status_id) {
        return Err(BoardValidationError::UnknownStatus(status_id));
    }
    if state.statuses.len() <= 1 {
        return Err(BoardValidationError::LastStatus(status_id));
    }
    if let Some(target) = migrate_to
        && (target == status_id || !state.statuses.contains(target))
    {
        return Err(BoardValidationError::InvalidMigrationTarget(target));
    }
    let task_count = state.tasks.count_in(status_id);
    if task_count > 0 && migrate_to.is_none() {
        return Err(BoardValidationError::StatusNotEmpty {
            status_id,
            task_count,
        });
    }
    Ok(())
}

/// Drops the column and re-homes its tasks at the end of the target column.
fn remove_and_migrate(
    state: &mut BoardState,
    status_id: StatusId,
    migrate_to: Option<StatusId>,
    spacing: PositionSpacing,
    at: DateTime<Utc>,
) -> usize {
    state.statuses.remove(status_id);

    let orphans: Vec<TaskId> = state
        .tasks
        .column(status_id)
        .into_iter()
        .map(Task::id)
        .collect();
    if orphans.is_empty() {
        return 0;
    }

    let destination = migrate_to
        .filter(|candidate| state.statuses.contains(*candidate))
        .or_else(|| {
            let fallback = state.statuses.ordered().first().map(|status| status.id());
            warn!(
                status_id = %status_id,
                count = orphans.len(),
                "tasks appeared in a deleted status; moving them to the first column"
            );
            fallback
        });
    let Some(target) = destination else {
        return 0;
    };

    let existing = BoardView::column_ranks(&state.tasks, target, None);
    for (task_id, position) in append(&existing, &orphans, spacing) {
        if let Some(task) = state.tasks.get_mut(task_id) {
            if task.status_id() == target {
                task.set_position(position);
            } else {
                task.place(target, position, at);
            }
        }
    }
    orphans.len()
}
