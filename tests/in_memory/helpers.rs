//! Shared helpers for in-memory board integration tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use eyre::{Result, eyre};
use mockable::DefaultClock;
use rstest::fixture;
use trellis::board::{
    adapters::memory::InMemoryBoardServer,
    domain::{
        Position, Priority, ProjectId, Status, StatusColor, StatusData, StatusId, Task, TaskData,
        TaskId,
    },
    services::{BoardConfig, BoardSession},
};

/// Session type used across the integration tests.
pub type TestSession = BoardSession<InMemoryBoardServer, DefaultClock>;

/// Server seeded with one project: To Do holds four tasks, Done holds one.
pub struct SeededServer {
    /// The server.
    pub server: InMemoryBoardServer,
    /// Seeded project.
    pub project_id: ProjectId,
    /// First column.
    pub todo: StatusId,
    /// Second column.
    pub done: StatusId,
    /// Tasks of To Do, in display order.
    pub todo_tasks: Vec<TaskId>,
    /// Tasks of Done, in display order.
    pub done_tasks: Vec<TaskId>,
}

impl SeededServer {
    /// Opens a session over the seeded project.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial load fails.
    pub async fn open(&self, config: BoardConfig) -> Result<TestSession> {
        let session = BoardSession::new(
            Arc::new(self.server.clone()),
            Arc::new(DefaultClock),
            config,
        );
        session.open(self.project_id).await?;
        Ok(session)
    }
}

fn seed_status(
    server: &InMemoryBoardServer,
    project_id: ProjectId,
    name: &str,
    position: Position,
) -> Result<StatusId> {
    let status = Status::from_data(StatusData {
        id: StatusId::new(),
        project_id,
        name: name.to_owned(),
        color: StatusColor::new("#2f855a")?,
        position,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    });
    let id = status.id();
    server.seed_status(status)?;
    Ok(id)
}

fn seed_tasks(
    server: &InMemoryBoardServer,
    project_id: ProjectId,
    status_id: StatusId,
    titles: &[&str],
) -> Result<Vec<TaskId>> {
    let ranks = BoardConfig::default().spacing().sequence(titles.len());
    titles
        .iter()
        .zip(ranks)
        .map(|(title, position)| -> Result<TaskId> {
            let task = Task::from_data(TaskData {
                id: TaskId::new(),
                project_id,
                title: (*title).to_owned(),
                description: None,
                status_id,
                priority: Priority::Medium,
                position,
                due_date: None,
                completed_at: None,
                assignees: BTreeSet::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            });
            let id = task.id();
            server.seed_task(task)?;
            Ok(id)
        })
        .collect()
}

/// Seeds a fresh server.
///
/// # Errors
///
/// Returns an error if any seed value is rejected.
pub fn seeded_server() -> Result<SeededServer> {
    let server = InMemoryBoardServer::new();
    let project_id = ProjectId::new();
    let spacing = BoardConfig::default().spacing();
    let first = spacing.initial();
    let second = spacing
        .after(first)
        .ok_or_else(|| eyre!("no rank after {}", first.value()))?;
    let todo = seed_status(&server, project_id, "To Do", first)?;
    let done = seed_status(&server, project_id, "Done", second)?;
    let todo_tasks = seed_tasks(&server, project_id, todo, &["T1", "T2", "T3", "T4"])?;
    let done_tasks = seed_tasks(&server, project_id, done, &["D1"])?;
    Ok(SeededServer {
        server,
        project_id,
        todo,
        done,
        todo_tasks,
        done_tasks,
    })
}

/// Provides a freshly seeded server for each test.
///
/// # Errors
///
/// Returns an error if seeding fails.
#[fixture]
pub fn seeded() -> Result<SeededServer> {
    seeded_server()
}

/// Yields until the server holds `count` move requests.
///
/// # Errors
///
/// Returns an error if the requests never arrive.
pub async fn wait_for_held(server: &InMemoryBoardServer, count: usize) -> Result<()> {
    for _ in 0..1_000 {
        if server.held_moves()?.len() >= count {
            return Ok(());
        }
        tokio::task::yield_now().await;
    }
    Err(eyre!("server never held {count} move(s)"))
}
