//! Shared board state and its change notifications.

use super::{BoardSnapshot, BoardSyncError, BoardSyncResult, BoardView};
use crate::board::domain::{BoardValidationError, ProjectId, StatusId, StatusSet, TaskId, TaskSet};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, watch};
use tracing::trace;

const SIGNAL_CAPACITY: usize = 256;

/// Success and failure events emitted for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardSignal {
    /// Tasks of a project replaced the working set.
    TasksLoaded {
        /// Loaded project.
        project_id: ProjectId,
        /// Number of tasks loaded.
        count: usize,
    },
    /// Columns of a project replaced the working set.
    StatusesLoaded {
        /// Loaded project.
        project_id: ProjectId,
        /// Number of columns loaded.
        count: usize,
    },
    /// A task created by the server joined the board.
    TaskCreated {
        /// New task.
        task_id: TaskId,
    },
    /// A move was confirmed by the server.
    MoveSettled {
        /// Moved task.
        task_id: TaskId,
    },
    /// A move failed and its optimistic placement was undone.
    MoveRolledBack {
        /// Moved task.
        task_id: TaskId,
        /// Failure description.
        reason: String,
    },
    /// A late response for a superseded move was discarded.
    MoveSuperseded {
        /// Moved task.
        task_id: TaskId,
        /// Failure the discarded response carried, if any.
        reason: Option<String>,
    },
    /// An edit was confirmed by the server.
    UpdateConfirmed {
        /// Edited task.
        task_id: TaskId,
    },
    /// An edit failed; the local change stays visible and is flagged dirty.
    UpdateUnconfirmed {
        /// Edited task.
        task_id: TaskId,
        /// Failure description.
        reason: String,
    },
    /// A delete failed; the row stays hidden until the next reload.
    DeleteFailed {
        /// Deleted task.
        task_id: TaskId,
        /// Failure description.
        reason: String,
    },
    /// A column was deleted.
    StatusDeleted {
        /// Removed column.
        status_id: StatusId,
        /// Column that received the tasks, if any.
        migrated_to: Option<StatusId>,
        /// Number of tasks reassigned.
        migrated: usize,
    },
}

/// Unconfirmed writes per task.
#[derive(Debug, Clone, Copy, Default)]
struct InFlight {
    moving: Option<u64>,
    updating: Option<u64>,
    /// Edits sent and not yet answered, superseded ones included.
    edits: u32,
    /// An older edit failed while `updating` was pending.
    update_lost: bool,
}

impl InFlight {
    const fn is_idle(self) -> bool {
        self.moving.is_none() && self.updating.is_none() && self.edits == 0
    }
}

/// Mutable working set of the loaded board.
#[derive(Debug, Default)]
pub(crate) struct BoardState {
    pub(crate) project_id: Option<ProjectId>,
    pub(crate) tasks: TaskSet,
    pub(crate) statuses: StatusSet,
    epoch: u64,
    revision: u64,
    next_ticket: u64,
    in_flight: HashMap<TaskId, InFlight>,
}

impl BoardState {
    /// Generation of the working set; bumped whenever it is replaced.
    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Fails unless `project_id` is the loaded project.
    pub(crate) fn require_project(
        &self,
        project_id: ProjectId,
    ) -> Result<(), BoardValidationError> {
        let loaded = self
            .project_id
            .ok_or(BoardValidationError::NoProjectLoaded)?;
        if loaded == project_id {
            Ok(())
        } else {
            Err(BoardValidationError::ProjectMismatch {
                loaded,
                requested: project_id,
            })
        }
    }

    /// Replaces the tasks; switching project also drops the columns.
    pub(crate) fn replace_tasks(&mut self, project_id: ProjectId, tasks: TaskSet) {
        if self.project_id != Some(project_id) {
            self.statuses = StatusSet::new();
        }
        self.project_id = Some(project_id);
        self.tasks = tasks;
        self.discard_in_flight();
    }

    /// Replaces the columns; switching project also drops the tasks.
    pub(crate) fn replace_statuses(&mut self, project_id: ProjectId, statuses: StatusSet) {
        if self.project_id != Some(project_id) {
            self.tasks = TaskSet::new();
            self.discard_in_flight();
        }
        self.project_id = Some(project_id);
        self.statuses = statuses;
    }

    /// Replaces the whole working set in one step.
    pub(crate) fn replace_board(
        &mut self,
        project_id: ProjectId,
        statuses: StatusSet,
        tasks: TaskSet,
    ) {
        self.project_id = Some(project_id);
        self.statuses = statuses;
        self.tasks = tasks;
        self.discard_in_flight();
    }

    /// Records a new move intent for the task and returns its ticket.
    pub(crate) fn issue_move(&mut self, task_id: TaskId) -> u64 {
        let ticket = self.next_ticket();
        self.in_flight.entry(task_id).or_default().moving = Some(ticket);
        ticket
    }

    /// Records a new edit intent for the task and returns its ticket.
    pub(crate) fn issue_update(&mut self, task_id: TaskId) -> u64 {
        let ticket = self.next_ticket();
        let pending = self.in_flight.entry(task_id).or_default();
        pending.updating = Some(ticket);
        pending.edits += 1;
        ticket
    }

    pub(crate) fn is_current_move(&self, task_id: TaskId, ticket: u64, epoch: u64) -> bool {
        self.epoch == epoch
            && self
                .in_flight
                .get(&task_id)
                .is_some_and(|pending| pending.moving == Some(ticket))
    }

    pub(crate) fn is_current_update(&self, task_id: TaskId, ticket: u64, epoch: u64) -> bool {
        self.epoch == epoch
            && self
                .in_flight
                .get(&task_id)
                .is_some_and(|pending| pending.updating == Some(ticket))
    }

    pub(crate) fn has_move_in_flight(&self, task_id: TaskId) -> bool {
        self.in_flight
            .get(&task_id)
            .is_some_and(|pending| pending.moving.is_some())
    }

    pub(crate) fn has_update_in_flight(&self, task_id: TaskId) -> bool {
        self.in_flight
            .get(&task_id)
            .is_some_and(|pending| pending.edits > 0)
    }

    /// Returns `true` when edits older than the latest are still unanswered.
    pub(crate) fn has_older_updates(&self, task_id: TaskId) -> bool {
        self.in_flight
            .get(&task_id)
            .is_some_and(|pending| pending.edits > 1)
    }

    pub(crate) fn finish_move(&mut self, task_id: TaskId) {
        self.finish(task_id, |pending| pending.moving = None);
    }

    pub(crate) fn finish_update(&mut self, task_id: TaskId) {
        self.finish(task_id, |pending| {
            pending.updating = None;
            pending.update_lost = false;
            pending.edits = pending.edits.saturating_sub(1);
        });
    }

    /// Accounts for the answer to a superseded edit.
    ///
    /// A failed answer is remembered while the latest edit is pending, so
    /// settling that edit keeps the local fields.
    pub(crate) fn drop_update(&mut self, task_id: TaskId, failed: bool) {
        self.finish(task_id, |pending| {
            pending.edits = pending.edits.saturating_sub(1);
            if failed && pending.updating.is_some() {
                pending.update_lost = true;
            }
        });
    }

    pub(crate) fn has_lost_update(&self, task_id: TaskId) -> bool {
        self.in_flight
            .get(&task_id)
            .is_some_and(|pending| pending.update_lost)
    }

    /// Drops every pending intent for a task that left the board.
    pub(crate) fn forget(&mut self, task_id: TaskId) {
        self.in_flight.remove(&task_id);
    }

    fn finish(&mut self, task_id: TaskId, clear: impl FnOnce(&mut InFlight)) {
        if let Some(pending) = self.in_flight.get_mut(&task_id) {
            clear(pending);
            if pending.is_idle() {
                self.in_flight.remove(&task_id);
            }
        }
    }

    const fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn discard_in_flight(&mut self) {
        self.in_flight.clear();
        self.epoch += 1;
    }

    fn project(&self) -> BoardSnapshot {
        BoardView::project(self.project_id, self.revision, &self.tasks, &self.statuses)
    }
}

#[derive(Debug)]
struct StoreInner {
    state: RwLock<BoardState>,
    snapshots: watch::Sender<BoardSnapshot>,
    signals: broadcast::Sender<BoardSignal>,
}

/// Handle to the board state shared by the registries of one session.
///
/// Cloning the handle shares the state. Every successful mutation is
/// projected and published to [`BoardStore::subscribe`] receivers before the
/// mutating call returns.
#[derive(Debug, Clone)]
pub struct BoardStore {
    inner: Arc<StoreInner>,
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardStore {
    /// Creates an empty store with no project loaded.
    #[must_use]
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(BoardSnapshot::default());
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(BoardState::default()),
                snapshots,
                signals,
            }),
        }
    }

    /// Subscribes to board snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Subscribes to success and failure signals.
    #[must_use]
    pub fn signals(&self) -> broadcast::Receiver<BoardSignal> {
        self.inner.signals.subscribe()
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Returns the loaded project, if any.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn project_id(&self) -> BoardSyncResult<Option<ProjectId>> {
        self.read(|state| state.project_id)
    }

    /// Copy of the task working set.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn tasks(&self) -> BoardSyncResult<TaskSet> {
        self.read(|state| state.tasks.clone())
    }

    /// Copy of the column working set.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the state lock is
    /// poisoned.
    pub fn statuses(&self) -> BoardSyncResult<StatusSet> {
        self.read(|state| state.statuses.clone())
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&BoardState) -> T) -> BoardSyncResult<T> {
        let state = self
            .inner
            .state
            .read()
            .map_err(|err| BoardSyncError::StatePoisoned(err.to_string()))?;
        Ok(f(&state))
    }

    /// Applies `f` under the write lock and publishes the new projection.
    ///
    /// Nothing is published when `f` fails; `f` must validate before it
    /// changes anything.
    pub(crate) fn mutate<T>(
        &self,
        f: impl FnOnce(&mut BoardState) -> BoardSyncResult<T>,
    ) -> BoardSyncResult<T> {
        let mut state = self
            .inner
            .state
            .write()
            .map_err(|err| BoardSyncError::StatePoisoned(err.to_string()))?;
        let output = f(&mut state)?;
        state.revision += 1;
        self.inner.snapshots.send_replace(state.project());
        Ok(output)
    }

    pub(crate) fn emit(&self, signal: BoardSignal) {
        if let Err(unsent) = self.inner.signals.send(signal) {
            trace!(signal = ?unsent.0, "no signal subscribers");
        }
    }
}
