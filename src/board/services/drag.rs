//! Drag-and-drop reordering on top of the task registry.
//!
//! A gesture walks `Idle -> Dragging -> Confirming -> Settled | RolledBack`.
//! Nothing changes while dragging; the drop stages the optimistic move and
//! the server response settles or rolls it back. When a newer gesture starts
//! on the same task it owns the reported phase, and the older gesture's
//! outcome is no longer published.

use super::{BoardSyncError, BoardSyncResult, BoardView, MoveOutcome, TaskRegistry};
use crate::board::{
    domain::{BoardValidationError, StatusId, TaskId},
    ports::BoardGateway,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Phase of the latest gesture on a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DragPhase {
    /// No gesture, or the last one was cancelled.
    #[default]
    Idle,
    /// Picked up; the board is unchanged.
    Dragging,
    /// Dropped; the move is visible and awaiting the server.
    Confirming,
    /// The server accepted the move.
    Settled,
    /// The move failed and was undone.
    RolledBack,
}

/// Where a dragged task was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// A slot of a column, counted without the dragged task.
    Slot {
        /// Destination column.
        status_id: StatusId,
        /// Index among the other tasks of the column.
        index: usize,
    },
    /// After the last task of a column.
    ColumnEnd {
        /// Destination column.
        status_id: StatusId,
    },
    /// Directly above another task, in that task's column.
    BeforeTask {
        /// Task the dragged task lands in front of.
        task_id: TaskId,
    },
}

#[derive(Debug, Default)]
struct GestureBook {
    next: u64,
    latest: HashMap<TaskId, (u64, DragPhase)>,
}

impl GestureBook {
    const fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    fn set(&mut self, task_id: TaskId, gesture: u64, phase: DragPhase) {
        self.latest.insert(task_id, (gesture, phase));
    }

    /// Updates the phase only while `gesture` is the latest for the task.
    ///
    /// `Idle` is the phase of an untracked task, so reaching it forgets the
    /// entry.
    fn advance(&mut self, task_id: TaskId, gesture: u64, phase: DragPhase) -> bool {
        let current = self
            .latest
            .get(&task_id)
            .is_some_and(|&(latest, _)| latest == gesture);
        if !current {
            return false;
        }
        if phase == DragPhase::Idle {
            self.latest.remove(&task_id);
        } else {
            self.latest.insert(task_id, (gesture, phase));
        }
        true
    }

    /// Forgets finished gestures on tasks that left the board.
    fn prune(&mut self, on_board: impl Fn(TaskId) -> bool) {
        self.latest.retain(|&task_id, &mut (_, phase)| {
            matches!(phase, DragPhase::Dragging | DragPhase::Confirming) || on_board(task_id)
        });
    }

    fn phase(&self, task_id: TaskId) -> DragPhase {
        self.latest
            .get(&task_id)
            .map_or(DragPhase::Idle, |&(_, phase)| phase)
    }
}

/// Turns drag gestures into optimistic moves.
pub struct DragReorderController<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    tasks: TaskRegistry<G, C>,
    gestures: Arc<Mutex<GestureBook>>,
}

impl<G, C> Clone for DragReorderController<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            gestures: Arc::clone(&self.gestures),
        }
    }
}

impl<G, C> DragReorderController<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    /// Creates a controller moving tasks through `tasks`.
    #[must_use]
    pub fn new(tasks: TaskRegistry<G, C>) -> Self {
        Self {
            tasks,
            gestures: Arc::new(Mutex::new(GestureBook::default())),
        }
    }

    /// Picks up a task.
    ///
    /// Picking up a task whose previous move is still confirming is allowed;
    /// the new gesture supersedes it.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::UnknownTask`] for a task not on the
    /// board and [`BoardValidationError::DragInProgress`] when the task is
    /// already being dragged.
    pub fn begin_drag(&self, task_id: TaskId) -> BoardSyncResult<DragGesture<G, C>> {
        self.tasks
            .store()
            .read(|state| self.with_book(|book| book.prune(|id| state.tasks.contains(id))))??;
        if self.tasks.task(task_id)?.is_none() {
            return Err(BoardValidationError::UnknownTask(task_id).into());
        }
        let gesture = self.with_book(|book| {
            if book.phase(task_id) == DragPhase::Dragging {
                return Err(BoardValidationError::DragInProgress(task_id));
            }
            let gesture = book.issue();
            book.set(task_id, gesture, DragPhase::Dragging);
            Ok(gesture)
        })??;
        debug!(task_id = %task_id, gesture, "drag started");
        Ok(DragGesture {
            controller: self.clone(),
            task_id,
            gesture,
            released: false,
        })
    }

    /// Phase of the latest gesture on the task.
    ///
    /// # Errors
    ///
    /// Returns [`BoardSyncError::StatePoisoned`] when the gesture lock is
    /// poisoned.
    pub fn phase(&self, task_id: TaskId) -> BoardSyncResult<DragPhase> {
        self.with_book(|book| book.phase(task_id))
    }

    #[cfg(test)]
    pub(crate) fn tracked_gestures(&self) -> BoardSyncResult<usize> {
        self.with_book(|book| book.latest.len())
    }

    /// Resolves a drop target into a destination column and index for
    /// `moving`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::UnknownTask`] when a
    /// [`DropTarget::BeforeTask`] names a task not on the board.
    pub fn resolve(
        &self,
        moving: TaskId,
        target: DropTarget,
    ) -> BoardSyncResult<(StatusId, usize)> {
        self.tasks.store().read(|state| -> Result<_, BoardValidationError> {
            match target {
                DropTarget::Slot { status_id, index } => Ok((status_id, index)),
                DropTarget::ColumnEnd { status_id } => {
                    let others = BoardView::column_ranks(&state.tasks, status_id, Some(moving));
                    Ok((status_id, others.len()))
                }
                DropTarget::BeforeTask { task_id } if task_id == moving => {
                    BoardView::locate(&state.tasks, moving)
                        .ok_or(BoardValidationError::UnknownTask(moving))
                }
                DropTarget::BeforeTask { task_id } => {
                    let anchor = state
                        .tasks
                        .get(task_id)
                        .ok_or(BoardValidationError::UnknownTask(task_id))?;
                    let status_id = anchor.status_id();
                    let others = BoardView::column_ranks(&state.tasks, status_id, Some(moving));
                    let end = others.len();
                    let index = others
                        .iter()
                        .position(|&(id, _)| id == task_id)
                        .unwrap_or(end);
                    Ok((status_id, index))
                }
            }
        })?
        .map_err(BoardSyncError::from)
    }

    /// Moves a task without an interactive gesture.
    ///
    /// # Errors
    ///
    /// See [`DragReorderController::begin_drag`] and
    /// [`DragGesture::drop_on`].
    pub async fn move_task(
        &self,
        task_id: TaskId,
        status_id: StatusId,
        index: usize,
    ) -> BoardSyncResult<MoveOutcome> {
        self.begin_drag(task_id)?
            .drop_on(DropTarget::Slot { status_id, index })
            .await
    }

    fn with_book<T>(&self, f: impl FnOnce(&mut GestureBook) -> T) -> BoardSyncResult<T> {
        let mut book = self
            .gestures
            .lock()
            .map_err(|err| BoardSyncError::StatePoisoned(err.to_string()))?;
        Ok(f(&mut book))
    }

    fn advance(&self, task_id: TaskId, gesture: u64, phase: DragPhase) {
        match self.with_book(|book| book.advance(task_id, gesture, phase)) {
            Ok(true) => debug!(task_id = %task_id, gesture, ?phase, "drag phase changed"),
            Ok(false) => debug!(task_id = %task_id, gesture, "gesture superseded"),
            Err(err) => debug!(task_id = %task_id, error = %err, "drag phase not recorded"),
        }
    }
}

/// A task picked up and not yet released.
///
/// Dropping the gesture without calling [`DragGesture::drop_on`] cancels it.
pub struct DragGesture<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    controller: DragReorderController<G, C>,
    task_id: TaskId,
    gesture: u64,
    released: bool,
}

impl<G, C> DragGesture<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    /// Returns the dragged task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Abandons the gesture without changing the board.
    pub fn cancel(mut self) {
        self.release(DragPhase::Idle);
    }

    /// Releases the task over `target` and waits for the move to settle.
    ///
    /// The move is visible in the published snapshot before the request is
    /// sent.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the target cannot be resolved, and
    /// the classified server failure when the move was rolled back.
    pub async fn drop_on(mut self, target: DropTarget) -> BoardSyncResult<MoveOutcome> {
        let staged = self
            .controller
            .resolve(self.task_id, target)
            .and_then(|(status_id, index)| {
                self.controller
                    .tasks
                    .stage_move(self.task_id, status_id, index)
            });
        let pending = match staged {
            Ok(pending) => pending,
            Err(err) => {
                self.release(DragPhase::Idle);
                return Err(err);
            }
        };
        self.release(DragPhase::Confirming);

        let outcome = self.controller.tasks.confirm_move(pending).await;
        match &outcome {
            Ok(MoveOutcome::Settled(_)) => {
                self.controller
                    .advance(self.task_id, self.gesture, DragPhase::Settled);
            }
            Ok(MoveOutcome::Removed) => {
                self.controller
                    .advance(self.task_id, self.gesture, DragPhase::Idle);
            }
            Ok(MoveOutcome::Superseded) => {}
            Err(_) => {
                self.controller
                    .advance(self.task_id, self.gesture, DragPhase::RolledBack);
            }
        }
        outcome
    }

    fn release(&mut self, phase: DragPhase) {
        self.released = true;
        self.controller.advance(self.task_id, self.gesture, phase);
    }
}

impl<G, C> Drop for DragGesture<G, C>
where
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    fn drop(&mut self) {
        if !self.released {
            self.release(DragPhase::Idle);
        }
    }
}
