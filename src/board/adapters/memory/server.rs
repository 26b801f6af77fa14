//! In-memory board server for tests and local wiring.
//!
//! Implements [`BoardGateway`] and [`GenerationGateway`] over plain maps, with
//! hooks for failure injection, call counting, pausing calls and holding move
//! responses so tests can release them in any order.
//!
//! [`GenerationGateway`]: crate::generation::ports::GenerationGateway

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::oneshot;

use crate::board::{
    domain::{
        MemberId, NewStatus, NewTask, Position, PositionSpacing, ProjectId, Status, StatusData,
        StatusId, StatusPatch, Task, TaskData, TaskId, TaskPatch, append, compare_status_rank,
        compare_task_rank,
    },
    ports::{BoardGateway, EntityKind, GatewayError, GatewayResult, MoveTaskRequest},
};
use crate::generation::domain::{BatchId, GenerationBatch, Proposal};

/// Remote operations observable on the in-memory server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    /// `fetch-tasks`.
    FetchTasks,
    /// `create-task`.
    CreateTask,
    /// `update-task`.
    UpdateTask,
    /// `move-task`.
    MoveTask,
    /// `delete-task`.
    DeleteTask,
    /// `assign`.
    AssignTask,
    /// `unassign`.
    UnassignTask,
    /// `fetch-statuses`.
    FetchStatuses,
    /// `create-status`.
    CreateStatus,
    /// `update-status`.
    UpdateStatus,
    /// `delete-status`.
    DeleteStatus,
    /// `submit-generation`.
    SubmitGeneration,
    /// `accept-generation`.
    AcceptGeneration,
}

/// How the server acknowledges a successful move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveAck {
    /// Respond with the canonical task.
    #[default]
    Canonical,
    /// Respond without a body.
    Empty,
}

/// Wakes a parked call, failing it when an error is given.
type Resumer = oneshot::Sender<Option<GatewayError>>;

/// A move request waiting for the test to release it.
struct HeldMove {
    request: MoveTaskRequest,
    reply: oneshot::Sender<GatewayResult<Option<Task>>>,
}

#[derive(Default)]
pub(crate) struct ServerState {
    pub(crate) tasks: HashMap<TaskId, Task>,
    pub(crate) statuses: HashMap<StatusId, Status>,
    pub(crate) batches: HashMap<BatchId, GenerationBatch>,
    pub(crate) scripted_proposals: VecDeque<Vec<Proposal>>,
    failures: HashMap<GatewayOperation, VecDeque<GatewayError>>,
    calls: HashMap<GatewayOperation, usize>,
    move_ack: MoveAck,
    hold_moves: bool,
    held: VecDeque<HeldMove>,
    paused: HashSet<GatewayOperation>,
    parked: HashMap<GatewayOperation, VecDeque<Resumer>>,
}

impl ServerState {
    /// Columns of a project in board order.
    pub(crate) fn ordered_statuses(&self, project_id: ProjectId) -> Vec<&Status> {
        let mut statuses: Vec<&Status> = self
            .statuses
            .values()
            .filter(|status| status.project_id() == project_id)
            .collect();
        statuses.sort_by(|left, right| compare_status_rank(left, right));
        statuses
    }

    /// Ranks of one column in display order.
    pub(crate) fn column_ranks(&self, status_id: StatusId) -> Vec<(TaskId, Position)> {
        let mut column: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| task.status_id() == status_id)
            .collect();
        column.sort_by(|left, right| compare_task_rank(left, right));
        column
            .into_iter()
            .map(|task| (task.id(), task.position()))
            .collect()
    }

    /// Rank for an entry appended to a column.
    pub(crate) fn next_task_position(&self, status_id: StatusId) -> Position {
        let spacing = PositionSpacing::default();
        self.column_ranks(status_id).last().map_or_else(
            || spacing.initial(),
            |&(_, last)| spacing.after(last).unwrap_or(last),
        )
    }

    fn next_status_position(&self, project_id: ProjectId) -> Position {
        let spacing = PositionSpacing::default();
        self.ordered_statuses(project_id).last().map_or_else(
            || spacing.initial(),
            |last| {
                let current = last.position();
                spacing.after(current).unwrap_or(current)
            },
        )
    }

    fn task_mut(&mut self, task_id: TaskId) -> GatewayResult<&mut Task> {
        self.tasks
            .get_mut(&task_id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::Task, task_id))
    }

    fn apply_move(&mut self, request: &MoveTaskRequest, at: DateTime<Utc>) -> GatewayResult<Task> {
        if !self.statuses.contains_key(&request.status_id) {
            return Err(GatewayError::not_found(EntityKind::Status, request.status_id));
        }
        let task = self.task_mut(request.task_id)?;
        task.place(request.status_id, request.position, at);
        Ok(task.clone())
    }

    fn answer_move(
        &mut self,
        request: &MoveTaskRequest,
        at: DateTime<Utc>,
    ) -> GatewayResult<Option<Task>> {
        let task = self.apply_move(request, at)?;
        Ok(match self.move_ack {
            MoveAck::Canonical => Some(task),
            MoveAck::Empty => None,
        })
    }
}

/// Outcome of a move request once the state lock is released.
enum MoveDispatch {
    Ready(GatewayResult<Option<Task>>),
    Held(oneshot::Receiver<GatewayResult<Option<Task>>>),
}

/// Thread-safe in-memory server implementing both gateway ports.
#[derive(Clone)]
pub struct InMemoryBoardServer {
    state: Arc<RwLock<ServerState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for InMemoryBoardServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBoardServer").finish_non_exhaustive()
    }
}

impl Default for InMemoryBoardServer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBoardServer {
    /// Creates an empty server using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Creates an empty server stamping records with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ServerState::default())),
            clock,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    pub(crate) fn write(&self) -> GatewayResult<RwLockWriteGuard<'_, ServerState>> {
        self.state
            .write()
            .map_err(|err| GatewayError::transport(std::io::Error::other(err.to_string())))
    }

    fn read(&self) -> GatewayResult<RwLockReadGuard<'_, ServerState>> {
        self.state
            .read()
            .map_err(|err| GatewayError::transport(std::io::Error::other(err.to_string())))
    }

    /// Counts the call and returns the next injected failure, if any.
    ///
    /// A call of a paused operation waits here until it is resumed.
    pub(crate) async fn call(&self, operation: GatewayOperation) -> GatewayResult<()> {
        let parked = {
            let mut state = self.write()?;
            *state.calls.entry(operation).or_default() += 1;
            if let Some(err) = state
                .failures
                .get_mut(&operation)
                .and_then(VecDeque::pop_front)
            {
                return Err(err);
            }
            if !state.paused.contains(&operation) {
                return Ok(());
            }
            let (resume, parked) = oneshot::channel();
            state.parked.entry(operation).or_default().push_back(resume);
            parked
        };
        match parked.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(closed) => Err(GatewayError::transport(closed)),
        }
    }

    /// Adds a column as if it already existed on the server.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn seed_status(&self, status: Status) -> GatewayResult<()> {
        self.write()?.statuses.insert(status.id(), status);
        Ok(())
    }

    /// Adds a task as if it already existed on the server.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn seed_task(&self, task: Task) -> GatewayResult<()> {
        self.write()?.tasks.insert(task.id(), task);
        Ok(())
    }

    /// Queues the proposals returned by the next generation request.
    ///
    /// Without a queued script the server proposes a single task titled
    /// after the prompt.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn script_proposals(&self, proposals: Vec<Proposal>) -> GatewayResult<()> {
        self.write()?.scripted_proposals.push_back(proposals);
        Ok(())
    }

    /// Makes the next call of `operation` fail with `error`.
    ///
    /// Several failures for one operation are used in order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn fail_next(&self, operation: GatewayOperation, error: GatewayError) -> GatewayResult<()> {
        self.write()?
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
        Ok(())
    }

    /// Number of times `operation` was called.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn call_count(&self, operation: GatewayOperation) -> GatewayResult<usize> {
        Ok(self.read()?.calls.get(&operation).copied().unwrap_or_default())
    }

    /// Chooses how successful moves are acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn set_move_ack(&self, ack: MoveAck) -> GatewayResult<()> {
        self.write()?.move_ack = ack;
        Ok(())
    }

    /// Parks subsequent calls of `operation` until they are resumed.
    ///
    /// Unpausing lets new calls through; calls already parked stay parked.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn set_paused(&self, operation: GatewayOperation, paused: bool) -> GatewayResult<()> {
        let mut state = self.write()?;
        if paused {
            state.paused.insert(operation);
        } else {
            state.paused.remove(&operation);
        }
        Ok(())
    }

    /// Number of parked calls of `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn parked(&self, operation: GatewayOperation) -> GatewayResult<usize> {
        Ok(self.read()?.parked.get(&operation).map_or(0, VecDeque::len))
    }

    /// Resumes the oldest parked call of `operation`.
    ///
    /// The call fails with `error` when one is given and runs normally
    /// otherwise. Returns `false` when no call was parked.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn resume_oldest(
        &self,
        operation: GatewayOperation,
        error: Option<GatewayError>,
    ) -> GatewayResult<bool> {
        self.resume(operation, error, VecDeque::pop_front)
    }

    /// Resumes the newest parked call of `operation`.
    ///
    /// See [`InMemoryBoardServer::resume_oldest`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn resume_newest(
        &self,
        operation: GatewayOperation,
        error: Option<GatewayError>,
    ) -> GatewayResult<bool> {
        self.resume(operation, error, VecDeque::pop_back)
    }

    fn resume(
        &self,
        operation: GatewayOperation,
        error: Option<GatewayError>,
        pick: impl FnOnce(&mut VecDeque<Resumer>) -> Option<Resumer>,
    ) -> GatewayResult<bool> {
        let mut state = self.write()?;
        let Some(resume) = state.parked.get_mut(&operation).and_then(pick) else {
            return Ok(false);
        };
        // The caller may have stopped waiting.
        drop(resume.send(error));
        Ok(true)
    }

    /// Holds subsequent move requests until they are released.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn hold_moves(&self, hold: bool) -> GatewayResult<()> {
        self.write()?.hold_moves = hold;
        Ok(())
    }

    /// Move requests currently held, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn held_moves(&self) -> GatewayResult<Vec<MoveTaskRequest>> {
        Ok(self.read()?.held.iter().map(|held| held.request).collect())
    }

    /// Answers the oldest held move, applying it unless `error` is given.
    ///
    /// Returns the released request, or `None` when nothing is held.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn release_oldest_move(
        &self,
        error: Option<GatewayError>,
    ) -> GatewayResult<Option<MoveTaskRequest>> {
        self.release_move(error, VecDeque::pop_front)
    }

    /// Answers the newest held move, applying it unless `error` is given.
    ///
    /// Returns the released request, or `None` when nothing is held.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn release_newest_move(
        &self,
        error: Option<GatewayError>,
    ) -> GatewayResult<Option<MoveTaskRequest>> {
        self.release_move(error, VecDeque::pop_back)
    }

    fn release_move(
        &self,
        error: Option<GatewayError>,
        pick: impl FnOnce(&mut VecDeque<HeldMove>) -> Option<HeldMove>,
    ) -> GatewayResult<Option<MoveTaskRequest>> {
        let at = self.now();
        let mut state = self.write()?;
        let Some(held) = pick(&mut state.held) else {
            return Ok(None);
        };
        let reply = error.map_or_else(|| state.answer_move(&held.request, at), Err);
        // The client may have stopped waiting; the move stays applied.
        drop(held.reply.send(reply));
        Ok(Some(held.request))
    }

    /// Server-side copy of a task.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn task(&self, task_id: TaskId) -> GatewayResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&task_id).cloned())
    }

    /// Server-side column of a project, in display order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn column(&self, status_id: StatusId) -> GatewayResult<Vec<TaskId>> {
        Ok(self
            .read()?
            .column_ranks(status_id)
            .into_iter()
            .map(|(task_id, _)| task_id)
            .collect())
    }

    /// Server-side copy of a batch.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the state lock is poisoned.
    pub fn batch(&self, batch_id: BatchId) -> GatewayResult<Option<GenerationBatch>> {
        Ok(self.read()?.batches.get(&batch_id).cloned())
    }

    fn dispatch_move(&self, request: &MoveTaskRequest) -> GatewayResult<MoveDispatch> {
        let at = self.now();
        let mut state = self.write()?;
        if state.hold_moves {
            let (reply, receiver) = oneshot::channel();
            state.held.push_back(HeldMove {
                request: *request,
                reply,
            });
            return Ok(MoveDispatch::Held(receiver));
        }
        Ok(MoveDispatch::Ready(state.answer_move(request, at)))
    }
}

#[async_trait]
impl BoardGateway for InMemoryBoardServer {
    async fn fetch_tasks(&self, project_id: ProjectId) -> GatewayResult<Vec<Task>> {
        self.call(GatewayOperation::FetchTasks).await?;
        let state = self.read()?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, project_id: ProjectId, draft: &NewTask) -> GatewayResult<Task> {
        self.call(GatewayOperation::CreateTask).await?;
        let at = self.now();
        let mut state = self.write()?;
        let owned_by_project = state
            .statuses
            .get(&draft.status_id())
            .is_some_and(|status| status.project_id() == project_id);
        if !owned_by_project {
            return Err(GatewayError::not_found(EntityKind::Status, draft.status_id()));
        }
        let task = Task::from_data(TaskData {
            id: TaskId::new(),
            project_id,
            title: draft.title().to_owned(),
            description: draft.description().map(str::to_owned),
            status_id: draft.status_id(),
            priority: draft.priority(),
            position: state.next_task_position(draft.status_id()),
            due_date: draft.due_date(),
            completed_at: None,
            assignees: draft.assignees().clone(),
            created_at: at,
            updated_at: at,
        });
        state.tasks.insert(task.id(), task.clone());
        Ok(task)
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> GatewayResult<Task> {
        self.call(GatewayOperation::UpdateTask).await?;
        let at = self.now();
        let mut state = self.write()?;
        let task = state.task_mut(task_id)?;
        task.apply_patch(patch, at);
        Ok(task.clone())
    }

    async fn move_task(&self, request: &MoveTaskRequest) -> GatewayResult<Option<Task>> {
        self.call(GatewayOperation::MoveTask).await?;
        match self.dispatch_move(request)? {
            MoveDispatch::Ready(result) => result,
            MoveDispatch::Held(receiver) => receiver.await.map_err(GatewayError::transport)?,
        }
    }

    async fn delete_task(&self, task_id: TaskId) -> GatewayResult<()> {
        self.call(GatewayOperation::DeleteTask).await?;
        self.write()?
            .tasks
            .remove(&task_id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(EntityKind::Task, task_id))
    }

    async fn assign_task(&self, task_id: TaskId, members: &[MemberId]) -> GatewayResult<Task> {
        self.call(GatewayOperation::AssignTask).await?;
        let at = self.now();
        let mut state = self.write()?;
        let task = state.task_mut(task_id)?;
        task.assign(members, at);
        Ok(task.clone())
    }

    async fn unassign_task(&self, task_id: TaskId, members: &[MemberId]) -> GatewayResult<Task> {
        self.call(GatewayOperation::UnassignTask).await?;
        let at = self.now();
        let mut state = self.write()?;
        let task = state.task_mut(task_id)?;
        task.unassign(members, at);
        Ok(task.clone())
    }

    async fn fetch_statuses(&self, project_id: ProjectId) -> GatewayResult<Vec<Status>> {
        self.call(GatewayOperation::FetchStatuses).await?;
        let state = self.read()?;
        Ok(state
            .ordered_statuses(project_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn create_status(&self, project_id: ProjectId, draft: &NewStatus) -> GatewayResult<Status> {
        self.call(GatewayOperation::CreateStatus).await?;
        let at = self.now();
        let mut state = self.write()?;
        let position = draft
            .position()
            .unwrap_or_else(|| state.next_status_position(project_id));
        let status = Status::from_data(StatusData {
            id: StatusId::new(),
            project_id,
            name: draft.name().to_owned(),
            color: draft.color().clone(),
            position,
            created_at: at,
            updated_at: at,
        });
        state.statuses.insert(status.id(), status.clone());
        Ok(status)
    }

    async fn update_status(&self, status_id: StatusId, patch: &StatusPatch) -> GatewayResult<Status> {
        self.call(GatewayOperation::UpdateStatus).await?;
        let at = self.now();
        let mut state = self.write()?;
        let status = state
            .statuses
            .get_mut(&status_id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::Status, status_id))?;
        status.apply_patch(patch, at);
        Ok(status.clone())
    }

    async fn delete_status(
        &self,
        status_id: StatusId,
        migrate_to: Option<StatusId>,
    ) -> GatewayResult<()> {
        self.call(GatewayOperation::DeleteStatus).await?;
        let at = self.now();
        let mut state = self.write()?;
        let project_id = state
            .statuses
            .get(&status_id)
            .map(Status::project_id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::Status, status_id))?;
        if state.ordered_statuses(project_id).len() <= 1 {
            return Err(GatewayError::Rejected(
                "a project must keep at least one status".to_owned(),
            ));
        }

        let orphans: Vec<TaskId> = state
            .column_ranks(status_id)
            .into_iter()
            .map(|(task_id, _)| task_id)
            .collect();
        match migrate_to {
            None if !orphans.is_empty() => {
                return Err(GatewayError::Rejected(format!(
                    "status still owns {} task(s)",
                    orphans.len()
                )));
            }
            None => {}
            Some(target) => {
                let valid = target != status_id
                    && state
                        .statuses
                        .get(&target)
                        .is_some_and(|status| status.project_id() == project_id);
                if !valid {
                    return Err(GatewayError::not_found(EntityKind::Status, target));
                }
                let existing = state.column_ranks(target);
                for (task_id, position) in append(&existing, &orphans, PositionSpacing::default()) {
                    if let Some(task) = state.tasks.get_mut(&task_id) {
                        task.place(target, position, at);
                    }
                }
            }
        }
        state.statuses.remove(&status_id);
        Ok(())
    }
}
