//! Shared world state for board move BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use trellis::board::{
    adapters::memory::InMemoryBoardServer,
    domain::{ProjectId, StatusId, TaskId},
    services::{BoardConfig, BoardSession, BoardSyncResult, MoveOutcome},
};

/// Session type used by the BDD world.
pub type TestSession = BoardSession<InMemoryBoardServer, DefaultClock>;

/// Scenario world for board move behaviour tests.
pub struct BoardWorld {
    /// Server the session talks to.
    pub server: InMemoryBoardServer,
    /// Configuration applied when the board is loaded.
    pub config: BoardConfig,
    /// Project every column and task belongs to.
    pub project_id: ProjectId,
    /// Columns by name.
    pub columns: HashMap<String, StatusId>,
    /// Tasks by title.
    pub tasks: HashMap<String, TaskId>,
    /// Session, once the board is loaded.
    pub session: Option<TestSession>,
    /// Result of the latest move.
    pub last_move: Option<BoardSyncResult<MoveOutcome>>,
    /// Result of the latest column deletion.
    pub last_delete: Option<BoardSyncResult<usize>>,
}

impl BoardWorld {
    /// Creates a world with an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: InMemoryBoardServer::new(),
            config: BoardConfig::default(),
            project_id: ProjectId::new(),
            columns: HashMap::new(),
            tasks: HashMap::new(),
            session: None,
            last_move: None,
            last_delete: None,
        }
    }

    /// Returns the loaded session.
    ///
    /// # Errors
    ///
    /// Fails when no step has loaded the board yet.
    pub fn session(&self) -> Result<&TestSession, eyre::Report> {
        self.session
            .as_ref()
            .ok_or_else(|| eyre::eyre!("board not loaded in scenario world"))
    }

    /// Looks up a column by name.
    ///
    /// # Errors
    ///
    /// Fails when no column has that name.
    pub fn column(&self, name: &str) -> Result<StatusId, eyre::Report> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown column {name}"))
    }

    /// Looks up a task by title.
    ///
    /// # Errors
    ///
    /// Fails when no task has that title.
    pub fn task(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.tasks
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown task {title}"))
    }
}

impl Default for BoardWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BoardWorld {
    BoardWorld::default()
}

/// Splits a comma separated step argument.
pub fn names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Builds a session over the world's server and configuration.
pub fn open_session(world: &BoardWorld) -> TestSession {
    BoardSession::new(
        Arc::new(world.server.clone()),
        Arc::new(DefaultClock),
        world.config.clone(),
    )
}
