//! Session loading and publication tests against the in-memory server.

use crate::in_memory::helpers::{SeededServer, seeded};
use eyre::{Result, ensure};
use rstest::rstest;
use std::time::Duration;
use trellis::board::{
    domain::ProjectId,
    services::{BoardConfig, BoardFilter, BoardSignal, MoveOutcome},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn open_publishes_the_whole_board(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;

    let snapshot = session.snapshot();
    ensure!(
        snapshot.project_id() == Some(board.project_id),
        "wrong project loaded"
    );
    let names: Vec<&str> = snapshot
        .statuses_ordered()
        .into_iter()
        .map(|status| status.name())
        .collect();
    ensure!(names == ["To Do", "Done"], "columns out of order: {names:?}");
    ensure!(
        snapshot.task_ids(board.todo) == board.todo_tasks,
        "To Do out of order"
    );
    ensure!(
        snapshot.task_ids(board.done) == board.done_tasks,
        "Done out of order"
    );
    ensure!(snapshot.unplaced().is_empty(), "tasks left unplaced");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subscribers_see_loads_and_signals(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;
    let mut snapshots = session.subscribe();
    let mut signals = session.signals();
    let before = snapshots.borrow_and_update().revision();

    session.open(board.project_id).await?;

    tokio::time::timeout(Duration::from_secs(1), snapshots.changed()).await??;
    let after = snapshots.borrow().revision();
    ensure!(after > before, "revision did not advance: {before} -> {after}");

    let first = signals.recv().await?;
    let second = signals.recv().await?;
    ensure!(
        matches!(first, BoardSignal::StatusesLoaded { count: 2, .. }),
        "unexpected first signal {first:?}"
    );
    ensure!(
        matches!(second, BoardSignal::TasksLoaded { count: 5, .. }),
        "unexpected second signal {second:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn opening_another_project_replaces_the_board(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;
    let empty_project = ProjectId::new();

    session.open(empty_project).await?;

    let snapshot = session.snapshot();
    ensure!(
        snapshot.project_id() == Some(empty_project),
        "project not switched"
    );
    ensure!(snapshot.columns().is_empty(), "old columns survived");
    ensure!(session.tasks().tasks()?.is_empty(), "old tasks survived");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn filtered_snapshot_keeps_empty_columns(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;

    let filtered = session
        .snapshot()
        .filtered(&BoardFilter::new().with_text("t2"));

    ensure!(filtered.columns().len() == 2, "columns dropped by the filter");
    let todo = filtered.task_ids(board.todo);
    ensure!(todo.len() == 1, "filter kept {todo:?}");
    ensure!(
        filtered.task_ids(board.done).is_empty(),
        "Done should be empty after filtering"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moves_past_the_end_land_last(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;
    let Some(&last) = board.todo_tasks.last() else {
        eyre::bail!("seeded column is empty");
    };

    let outcome = session.move_task(last, board.done, 99).await?;

    ensure!(
        matches!(outcome, MoveOutcome::Settled(_)),
        "move not settled: {outcome:?}"
    );
    let local = session.snapshot().task_ids(board.done);
    ensure!(local.last() == Some(&last), "moved task not last: {local:?}");
    ensure!(
        board.server.column(board.done)? == local,
        "server and client disagree"
    );
    Ok(())
}
