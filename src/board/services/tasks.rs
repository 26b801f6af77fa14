//! Task working set and its server reconciliation.

use super::optimistic::{OptimisticMutation, Pending, Reconciled, within};
use super::store::BoardState;
use super::{BoardConfig, BoardSignal, BoardStore, BoardSyncError, BoardSyncResult, BoardView};
use crate::board::{
    domain::{
        BoardValidationError, MemberId, NewTask, PositionSpacing, ProjectId, Retain, StatusId,
        Task, TaskId, TaskPatch, TaskSet, place,
    },
    ports::{BoardGateway, GatewayError, MoveTaskRequest},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Final outcome of a confirmed move.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The server accepted the move; carries the settled task.
    Settled(Task),
    /// A later move on the same task, or a reload, took over; the response
    /// was discarded.
    Superseded,
    /// The task left the board while the move was pending.
    Removed,
}

/// Owns the tasks of the loaded project.
///
/// Creates wait for the server. Moves, edits and deletes are applied locally
/// first and reconciled when the response arrives: failed moves roll back,
/// failed edits stay visible but are flagged dirty, failed deletes stay
/// applied until the next reload.
pub struct TaskRegistry<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    gateway: Arc<G>,
    clock: Arc<C>,
    store: BoardStore,
    config: BoardConfig,
}

impl<G, C> Clone for TaskRegistry<G, C>
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

impl<G, C> TaskRegistry<G, C>
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

    /// Returns the shared store.
    #[must_use]
    pub const fn store(&self) -> &BoardStore {
        &self.store
    }

    /// Returns a copy of one task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn task(&self, task_id: TaskId) -> BoardSyncResult<Option<Task>> {
        self.store.read(|state| state.tasks.get(task_id).cloned())
    }

    /// Returns a copy of the working set.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn tasks(&self) -> BoardSyncResult<TaskSet> {
        self.store.tasks()
    }

    /// Identifiers of tasks whose last edit the server never confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn dirty_tasks(&self) -> BoardSyncResult<Vec<TaskId>> {
        self.store.read(|state| state.tasks.dirty_ids().collect())
    }

    /// Returns `true` when the task carries an unconfirmed edit.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn is_dirty(&self, task_id: TaskId) -> BoardSyncResult<bool> {
        self.store.read(|state| state.tasks.is_dirty(task_id))
    }

    /// Replaces the working set with the project's tasks.
    ///
    /// Unconfirmed local changes are discarded, as are responses to requests
    /// sent before the load. On failure the previous working set is kept.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::Fetch`] when the tasks cannot be fetched.
    pub async fn load(&self, project_id: ProjectId) -> BoardSyncResult<usize> {
        let tasks = self.fetch(project_id).await?;
        let count = tasks.len();
        self.store.mutate(|state| {
            state.replace_tasks(project_id, TaskSet::from_tasks(tasks));
            Ok(())
        })?;
        info!(project_id = %project_id, count, "tasks loaded");
        self.store
            .emit(BoardSignal::TasksLoaded { project_id, count });
        Ok(count)
    }

    /// Reloads the loaded project.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::NoProjectLoaded`] when nothing was
    /// loaded, or [`BoardSyncError::Fetch`] when the fetch fails.
    pub async fn reload(&self) -> BoardSyncResult<usize> {
        let project_id = self
            .store
            .project_id()?
            .ok_or(BoardValidationError::NoProjectLoaded)?;
        self.load(project_id).await
    }

    pub(crate) async fn fetch(&self, project_id: ProjectId) -> BoardSyncResult<Vec<Task>> {
        within(
            self.config.request_timeout(),
            self.gateway.fetch_tasks(project_id),
        )
        .await
        .map_err(BoardSyncError::fetch)
    }

    /// Creates a task and inserts the server's record.
    ///
    /// # Errors
    ///
    /// Returns a validation error without contacting the server when the
    /// draft is invalid, the project is not the loaded one, or the column is
    /// not on the board. Server failures are classified as fetch or conflict
    /// failures.
    pub async fn create(&self, project_id: ProjectId, draft: &NewTask) -> BoardSyncResult<Task> {
        draft.validate()?;
        self.store.read(|state| {
            state.require_project(project_id)?;
            if state.statuses.contains(draft.status_id()) {
                Ok(())
            } else {
                Err(BoardValidationError::UnknownStatus(draft.status_id()))
            }
        })??;

        let task = within(
            self.config.request_timeout(),
            self.gateway.create_task(project_id, draft),
        )
        .await?;

        let inserted = self.store.mutate(|state| {
            let current = state.project_id == Some(task.project_id());
            if current {
                state.tasks.insert(task.clone());
            }
            Ok(current)
        })?;
        if inserted {
            debug!(task_id = %task.id(), "task created");
            self.store
                .emit(BoardSignal::TaskCreated { task_id: task.id() });
        } else {
            debug!(task_id = %task.id(), "created task belongs to an unloaded project");
        }
        Ok(task)
    }

    /// Edits a task, showing the change before the server confirms it.
    ///
    /// On success the server's record replaces the local one. On failure the
    /// local edit stays and the task is flagged dirty, including when a newer
    /// edit of the same task was sent before this one failed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty patch or unknown task, and a
    /// fetch or conflict failure when the server does not confirm.
    pub async fn update(&self, task_id: TaskId, patch: TaskPatch) -> BoardSyncResult<Task> {
        let request = patch.clone();
        let pending = Pending::apply(
            &self.store,
            UpdateMutation {
                task_id,
                patch,
                at: self.clock.utc(),
            },
        )?;
        let response = self.gateway.update_task(task_id, &request);
        match pending
            .confirm(self.config.request_timeout(), response)
            .await?
        {
            Reconciled::Settled(task) => {
                self.store.emit(BoardSignal::UpdateConfirmed { task_id });
                Ok(task)
            }
            Reconciled::Reverted(err) | Reconciled::Discarded(Some(err)) => {
                warn!(task_id = %task_id, error = %err, "update unconfirmed; task flagged dirty");
                self.store.emit(BoardSignal::UpdateUnconfirmed {
                    task_id,
                    reason: err.to_string(),
                });
                Err(err.into())
            }
            Reconciled::Discarded(None) => {
                debug!(task_id = %task_id, "discarding superseded update response");
                self.task(task_id)?
                    .ok_or_else(|| BoardValidationError::UnknownTask(task_id).into())
            }
        }
    }

    /// Deletes a task, hiding it before the server confirms.
    ///
    /// A failed delete is not undone; reload to recover the row. The failure
    /// is returned even when a reload already brought the row back.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::UnknownTask`] for a task not on the
    /// board, and a fetch or conflict failure when the server does not
    /// confirm.
    pub async fn delete(&self, task_id: TaskId) -> BoardSyncResult<()> {
        let pending = Pending::apply(&self.store, DeleteMutation { task_id })?;
        let response = self.gateway.delete_task(task_id);
        match pending
            .confirm(self.config.request_timeout(), response)
            .await?
        {
            Reconciled::Settled(()) | Reconciled::Discarded(None) => Ok(()),
            Reconciled::Reverted(err) | Reconciled::Discarded(Some(err)) => {
                warn!(task_id = %task_id, error = %err, "delete failed; reload to recover");
                self.store.emit(BoardSignal::DeleteFailed {
                    task_id,
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Adds members to a task once the server confirms.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty member list or unknown task,
    /// and a fetch or conflict failure when the server refuses.
    pub async fn assign(&self, task_id: TaskId, members: &[MemberId]) -> BoardSyncResult<Task> {
        self.check_assignment(task_id, members)?;
        let canonical = within(
            self.config.request_timeout(),
            self.gateway.assign_task(task_id, members),
        )
        .await?;
        self.absorb(canonical)
    }

    /// Removes members from a task once the server confirms.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty member list or unknown task,
    /// and a fetch or conflict failure when the server refuses.
    pub async fn unassign(&self, task_id: TaskId, members: &[MemberId]) -> BoardSyncResult<Task> {
        self.check_assignment(task_id, members)?;
        let canonical = within(
            self.config.request_timeout(),
            self.gateway.unassign_task(task_id, members),
        )
        .await?;
        self.absorb(canonical)
    }

    fn check_assignment(&self, task_id: TaskId, members: &[MemberId]) -> BoardSyncResult<()> {
        if members.is_empty() {
            return Err(BoardValidationError::EmptyAssignees.into());
        }
        self.store.read(|state| {
            if state.project_id.is_none() {
                return Err(BoardValidationError::NoProjectLoaded);
            }
            if state.tasks.contains(task_id) {
                Ok(())
            } else {
                Err(BoardValidationError::UnknownTask(task_id))
            }
        })??;
        Ok(())
    }

    /// Merges a server record, keeping fields owned by unconfirmed writes.
    fn absorb(&self, canonical: Task) -> BoardSyncResult<Task> {
        self.store.mutate(|state| {
            let task_id = canonical.id();
            let retain = Retain {
                placement: state.has_move_in_flight(task_id),
                content: state.has_update_in_flight(task_id),
            };
            let Some(task) = state.tasks.get_mut(task_id) else {
                return Ok(canonical);
            };
            task.absorb(canonical, retain);
            Ok(task.clone())
        })
    }

    /// Moves a task and waits for the server to confirm.
    ///
    /// The move is visible in the published snapshot before the request is
    /// sent. `index` counts positions in the destination column excluding
    /// the moved task and is clamped to the column length.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown task or column. When the
    /// server refuses or does not answer in time the move is rolled back and
    /// the failure is returned.
    pub async fn move_task(
        &self,
        task_id: TaskId,
        status_id: StatusId,
        index: usize,
    ) -> BoardSyncResult<MoveOutcome> {
        let pending = self.stage_move(task_id, status_id, index)?;
        self.confirm_move(pending).await
    }

    pub(crate) fn stage_move(
        &self,
        task_id: TaskId,
        status_id: StatusId,
        index: usize,
    ) -> BoardSyncResult<PendingMove> {
        let pending = Pending::apply(
            &self.store,
            MoveMutation {
                task_id,
                status_id,
                index,
                spacing: self.config.spacing(),
                at: self.clock.utc(),
            },
        )?;
        Ok(PendingMove { pending })
    }

    pub(crate) async fn confirm_move(&self, pending: PendingMove) -> BoardSyncResult<MoveOutcome> {
        let request = pending.request();
        let task_id = request.task_id;
        let response = self.gateway.move_task(&request);
        match pending
            .pending
            .confirm(self.config.request_timeout(), response)
            .await?
        {
            Reconciled::Settled(Some(task)) => {
                debug!(task_id = %task_id, status_id = %task.status_id(), "move settled");
                self.store.emit(BoardSignal::MoveSettled { task_id });
                Ok(MoveOutcome::Settled(task))
            }
            Reconciled::Settled(None) => {
                debug!(task_id = %task_id, "move settled for a task no longer on the board");
                self.store.emit(BoardSignal::MoveSettled { task_id });
                Ok(MoveOutcome::Removed)
            }
            Reconciled::Discarded(failure) => {
                let reason = failure.as_ref().map(ToString::to_string);
                self.store.emit(BoardSignal::MoveSuperseded {
                    task_id,
                    reason: reason.clone(),
                });
                if self.task(task_id)?.is_none() {
                    debug!(task_id = %task_id, ?reason, "task deleted while its move was pending");
                    return Ok(MoveOutcome::Removed);
                }
                debug!(task_id = %task_id, ?reason, "discarding superseded move response");
                Ok(MoveOutcome::Superseded)
            }
            Reconciled::Reverted(err) => {
                warn!(task_id = %task_id, error = %err, "move rolled back");
                self.store.emit(BoardSignal::MoveRolledBack {
                    task_id,
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }
}

/// A move applied locally whose request has not been sent yet.
pub(crate) struct PendingMove {
    pending: Pending<MoveMutation>,
}

impl PendingMove {
    pub(crate) const fn request(&self) -> MoveTaskRequest {
        self.pending.staged().request
    }
}

struct MoveMutation {
    task_id: TaskId,
    status_id: StatusId,
    index: usize,
    spacing: PositionSpacing,
    at: DateTime<Utc>,
}

struct StagedMove {
    request: MoveTaskRequest,
    ticket: u64,
    epoch: u64,
    before: TaskSet,
    applied: TaskSet,
    renumbered: Vec<TaskId>,
}

impl OptimisticMutation for MoveMutation {
    type Staged = StagedMove;
    type Response = Option<Task>;
    type Output = Option<Task>;

    fn stage(&self, state: &mut BoardState) -> BoardSyncResult<StagedMove> {
        if !state.tasks.contains(self.task_id) {
            return Err(BoardValidationError::UnknownTask(self.task_id).into());
        }
        if !state.statuses.contains(self.status_id) {
            return Err(BoardValidationError::UnknownStatus(self.status_id).into());
        }

        let before = state.tasks.clone();
        let column = BoardView::column_ranks(&state.tasks, self.status_id, Some(self.task_id));
        let placement = place(&column, self.index, self.spacing);

        for &(neighbour, position) in &placement.renumbered {
            if let Some(task) = state.tasks.get_mut(neighbour) {
                task.set_position(position);
            }
        }
        if let Some(task) = state.tasks.get_mut(self.task_id) {
            task.place(self.status_id, placement.position, self.at);
        }
        if !placement.renumbered.is_empty() {
            debug!(
                status_id = %self.status_id,
                count = placement.renumbered.len(),
                "destination column re-spaced"
            );
        }

        let ticket = state.issue_move(self.task_id);
        debug!(
            task_id = %self.task_id,
            status_id = %self.status_id,
            index = placement.index,
            position = %placement.position,
            "move staged"
        );
        Ok(StagedMove {
            request: MoveTaskRequest {
                task_id: self.task_id,
                status_id: self.status_id,
                position: placement.position,
                index: placement.index,
            },
            ticket,
            epoch: state.epoch(),
            before,
            applied: state.tasks.clone(),
            renumbered: placement
                .renumbered
                .iter()
                .map(|&(neighbour, _)| neighbour)
                .collect(),
        })
    }

    fn is_current(&self, state: &BoardState, staged: &StagedMove) -> bool {
        state.is_current_move(self.task_id, staged.ticket, staged.epoch)
    }

    fn settle(
        &self,
        state: &mut BoardState,
        _staged: &StagedMove,
        response: Option<Task>,
    ) -> Option<Task> {
        state.finish_move(self.task_id);
        let retain = Retain {
            placement: false,
            content: state.has_update_in_flight(self.task_id),
        };
        let task = state.tasks.get_mut(self.task_id)?;
        if let Some(canonical) = response {
            task.absorb(canonical, retain);
        }
        Some(task.clone())
    }

    fn revert(&self, state: &mut BoardState, staged: &StagedMove, _error: &GatewayError) {
        state.finish_move(self.task_id);

        // The origin column may have been deleted while the move was pending.
        let origin_exists = staged
            .before
            .get(self.task_id)
            .is_some_and(|prior| state.statuses.contains(prior.status_id()));
        if !origin_exists {
            return;
        }

        let moved_untouched = state.tasks.get(self.task_id) == staged.applied.get(self.task_id);
        if moved_untouched {
            state.tasks.restore_entry(self.task_id, &staged.before);
        } else if let (Some(task), Some(prior)) = (
            state.tasks.get_mut(self.task_id),
            staged.before.get(self.task_id),
        ) {
            // Keep the newer edit; only the placement is undone.
            let at = task.updated_at();
            task.place(prior.status_id(), prior.position(), at);
        }

        for &neighbour in &staged.renumbered {
            if state.tasks.get(neighbour) == staged.applied.get(neighbour) {
                state.tasks.restore_entry(neighbour, &staged.before);
            }
        }
    }
}

struct UpdateMutation {
    task_id: TaskId,
    patch: TaskPatch,
    at: DateTime<Utc>,
}

struct StagedUpdate {
    ticket: u64,
    epoch: u64,
}

impl OptimisticMutation for UpdateMutation {
    type Staged = StagedUpdate;
    type Response = Task;
    type Output = Task;

    fn stage(&self, state: &mut BoardState) -> BoardSyncResult<StagedUpdate> {
        self.patch.validate()?;
        let task = state
            .tasks
            .get_mut(self.task_id)
            .ok_or(BoardValidationError::UnknownTask(self.task_id))?;
        task.apply_patch(&self.patch, self.at);
        let ticket = state.issue_update(self.task_id);
        debug!(task_id = %self.task_id, "update staged");
        Ok(StagedUpdate {
            ticket,
            epoch: state.epoch(),
        })
    }

    fn is_current(&self, state: &BoardState, staged: &StagedUpdate) -> bool {
        state.is_current_update(self.task_id, staged.ticket, staged.epoch)
    }

    fn settle(&self, state: &mut BoardState, _staged: &StagedUpdate, response: Task) -> Task {
        // Fields of an older edit that failed, or is still unanswered, are
        // only held locally.
        let lost = state.has_lost_update(self.task_id);
        let older = state.has_older_updates(self.task_id);
        state.finish_update(self.task_id);
        let retain = Retain {
            placement: state.has_move_in_flight(self.task_id),
            content: lost || older,
        };
        if !lost {
            state.tasks.clear_dirty(self.task_id);
        }
        let Some(task) = state.tasks.get_mut(self.task_id) else {
            return response;
        };
        task.absorb(response, retain);
        task.clone()
    }

    fn revert(&self, state: &mut BoardState, _staged: &StagedUpdate, _error: &GatewayError) {
        state.finish_update(self.task_id);
        state.tasks.mark_dirty(self.task_id);
    }

    fn discard(
        &self,
        state: &mut BoardState,
        staged: &StagedUpdate,
        failure: Option<&GatewayError>,
    ) {
        if state.epoch() != staged.epoch {
            return;
        }
        state.drop_update(self.task_id, failure.is_some());
        if failure.is_some() && state.tasks.contains(self.task_id) {
            state.tasks.mark_dirty(self.task_id);
        }
    }
}

struct DeleteMutation {
    task_id: TaskId,
}

impl OptimisticMutation for DeleteMutation {
    type Staged = u64;
    type Response = ();
    type Output = ();

    fn stage(&self, state: &mut BoardState) -> BoardSyncResult<u64> {
        state
            .tasks
            .remove(self.task_id)
            .ok_or(BoardValidationError::UnknownTask(self.task_id))?;
        state.forget(self.task_id);
        debug!(task_id = %self.task_id, "delete staged");
        Ok(state.epoch())
    }

    fn is_current(&self, state: &BoardState, epoch: &u64) -> bool {
        state.epoch() == *epoch
    }

    fn settle(&self, _state: &mut BoardState, _epoch: &u64, (): ()) {}

    fn revert(&self, _state: &mut BoardState, _epoch: &u64, _error: &GatewayError) {}
}
