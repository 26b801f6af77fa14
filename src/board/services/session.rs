//! One loaded board with its registries and drag controller.

use super::{
    BoardConfig, BoardSignal, BoardSnapshot, BoardStore, BoardSyncResult, DragReorderController,
    MoveOutcome, StatusRegistry, TaskRegistry,
};
use crate::board::{
    domain::{ProjectId, StatusId, StatusSet, TaskId, TaskSet},
    ports::BoardGateway,
};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::info;

/// Entry point for a presentation layer.
///
/// All components share one [`BoardStore`], so a move made through the drag
/// controller is immediately visible through the registries and the
/// published snapshots.
pub struct BoardSession<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    store: BoardStore,
    tasks: TaskRegistry<G, C>,
    statuses: StatusRegistry<G, C>,
    drag: DragReorderController<G, C>,
}

impl<G, C> BoardSession<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    /// Wires a session around an empty store.
    #[must_use]
    pub fn new(gateway: Arc<G>, clock: Arc<C>, config: BoardConfig) -> Self {
        let store = BoardStore::new();
        let tasks = TaskRegistry::new(
            Arc::clone(&gateway),
            Arc::clone(&clock),
            store.clone(),
            config.clone(),
        );
        let statuses = StatusRegistry::new(gateway, clock, store.clone(), config);
        let drag = DragReorderController::new(tasks.clone());
        Self {
            store,
            tasks,
            statuses,
            drag,
        }
    }

    /// Loads a project, replacing the whole working set at once.
    ///
    /// Columns and tasks are fetched concurrently; nothing changes unless
    /// both arrive.
    ///
    /// # Errors
    ///
    /// Returns [`super::BoardSyncError::Fetch`] when either fetch fails.
    pub async fn open(&self, project_id: ProjectId) -> BoardSyncResult<()> {
        let (fetched_statuses, fetched_tasks) = tokio::join!(
            self.statuses.fetch(project_id),
            self.tasks.fetch(project_id)
        );
        let (statuses, tasks) = (fetched_statuses?, fetched_tasks?);
        let (status_count, task_count) = (statuses.len(), tasks.len());

        self.store.mutate(|state| {
            state.replace_board(
                project_id,
                StatusSet::from_statuses(statuses),
                TaskSet::from_tasks(tasks),
            );
            Ok(())
        })?;
        info!(
            project_id = %project_id,
            statuses = status_count,
            tasks = task_count,
            "project opened"
        );
        self.store.emit(BoardSignal::StatusesLoaded {
            project_id,
            count: status_count,
        });
        self.store.emit(BoardSignal::TasksLoaded {
            project_id,
            count: task_count,
        });
        Ok(())
    }

    /// Returns the task registry.
    #[must_use]
    pub const fn tasks(&self) -> &TaskRegistry<G, C> {
        &self.tasks
    }

    /// Returns the column registry.
    #[must_use]
    pub const fn statuses(&self) -> &StatusRegistry<G, C> {
        &self.statuses
    }

    /// Returns the drag controller.
    #[must_use]
    pub const fn drag(&self) -> &DragReorderController<G, C> {
        &self.drag
    }

    /// Returns the shared store.
    #[must_use]
    pub const fn store(&self) -> &BoardStore {
        &self.store
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        self.store.snapshot()
    }

    /// Subscribes to board snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.store.subscribe()
    }

    /// Subscribes to success and failure signals.
    #[must_use]
    pub fn signals(&self) -> broadcast::Receiver<BoardSignal> {
        self.store.signals()
    }

    /// Moves a task through the drag controller.
    ///
    /// # Errors
    ///
    /// See [`DragReorderController::move_task`].
    pub async fn move_task(
        &self,
        task_id: TaskId,
        status_id: StatusId,
        index: usize,
    ) -> BoardSyncResult<MoveOutcome> {
        self.drag.move_task(task_id, status_id, index).await
    }
}
