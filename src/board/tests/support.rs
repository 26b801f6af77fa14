//! Builders shared by the board unit tests.

use std::sync::Arc;

use crate::board::{
    adapters::memory::{GatewayOperation, InMemoryBoardServer},
    domain::{
        Position, Priority, ProjectId, Status, StatusColor, StatusData, StatusId, Task, TaskData,
        TaskId,
    },
    services::{BoardConfig, BoardSession},
};
use chrono::{DateTime, TimeZone, Utc};
use eyre::{Result, eyre};
use mockable::DefaultClock;

pub(super) type TestSession = BoardSession<InMemoryBoardServer, DefaultClock>;

pub(super) fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

pub(super) fn rank(value: f64) -> Result<Position> {
    Ok(Position::new(value)?)
}

pub(super) fn status(project_id: ProjectId, name: &str, position: f64) -> Result<Status> {
    Ok(Status::from_data(StatusData {
        id: StatusId::new(),
        project_id,
        name: name.to_owned(),
        color: StatusColor::new("#4a90d9")?,
        position: rank(position)?,
        created_at: seeded_at(),
        updated_at: seeded_at(),
    }))
}

pub(super) fn task(
    project_id: ProjectId,
    status_id: StatusId,
    title: &str,
    position: f64,
) -> Result<Task> {
    Ok(Task::from_data(TaskData {
        id: TaskId::new(),
        project_id,
        title: title.to_owned(),
        description: None,
        status_id,
        priority: Priority::Medium,
        position: rank(position)?,
        due_date: None,
        completed_at: None,
        assignees: std::collections::BTreeSet::new(),
        created_at: seeded_at(),
        updated_at: seeded_at(),
    }))
}

/// To Do = [A(1), B(2)], Done = [C(1)], loaded into a fresh session.
pub(super) struct SeededBoard {
    pub(super) server: InMemoryBoardServer,
    pub(super) session: TestSession,
    pub(super) project_id: ProjectId,
    pub(super) todo: StatusId,
    pub(super) done: StatusId,
    pub(super) a: TaskId,
    pub(super) b: TaskId,
    pub(super) c: TaskId,
}

impl SeededBoard {
    pub(super) fn column(&self, status_id: StatusId) -> Vec<TaskId> {
        self.session.snapshot().task_ids(status_id)
    }

    pub(super) fn position_of(&self, task_id: TaskId) -> Result<Position> {
        self.session
            .tasks()
            .task(task_id)?
            .map(|found| found.position())
            .ok_or_else(|| eyre!("task {task_id} missing"))
    }
}

pub(super) async fn seeded_board(config: BoardConfig) -> Result<SeededBoard> {
    let server = InMemoryBoardServer::new();
    let project_id = ProjectId::new();
    let todo = status(project_id, "To Do", 1.0)?;
    let done = status(project_id, "Done", 2.0)?;
    let a = task(project_id, todo.id(), "A", 1.0)?;
    let b = task(project_id, todo.id(), "B", 2.0)?;
    let c = task(project_id, done.id(), "C", 1.0)?;

    let seeded = SeededBoard {
        server: server.clone(),
        session: BoardSession::new(Arc::new(server.clone()), Arc::new(DefaultClock), config),
        project_id,
        todo: todo.id(),
        done: done.id(),
        a: a.id(),
        b: b.id(),
        c: c.id(),
    };
    server.seed_status(todo)?;
    server.seed_status(done)?;
    for seeded_task in [a, b, c] {
        server.seed_task(seeded_task)?;
    }
    seeded.session.open(project_id).await?;
    Ok(seeded)
}

/// Yields until the server holds `count` move requests.
pub(super) async fn wait_for_held(server: &InMemoryBoardServer, count: usize) -> Result<()> {
    for _ in 0..1_000 {
        if server.held_moves()?.len() >= count {
            return Ok(());
        }
        tokio::task::yield_now().await;
    }
    Err(eyre!("server never held {count} move(s)"))
}

/// Yields until the server parks `count` calls of `operation`.
pub(super) async fn wait_for_parked(
    server: &InMemoryBoardServer,
    operation: GatewayOperation,
    count: usize,
) -> Result<()> {
    for _ in 0..1_000 {
        if server.parked(operation)? >= count {
            return Ok(());
        }
        tokio::task::yield_now().await;
    }
    Err(eyre!("server never parked {count} {operation:?} call(s)"))
}
