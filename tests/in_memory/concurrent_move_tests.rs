//! Overlapping moves of different tasks on one board.

use crate::in_memory::helpers::{SeededServer, seeded, wait_for_held};
use eyre::{Result, bail, ensure};
use rstest::rstest;
use trellis::board::{
    ports::GatewayError,
    services::{BoardConfig, FailureKind, MoveOutcome},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disjoint_moves_settle_together(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;
    let [first, _, third, _] = board.todo_tasks.as_slice() else {
        bail!("expected four seeded tasks");
    };

    let (moved_first, moved_third) = tokio::join!(
        session.move_task(*first, board.done, 0),
        session.move_task(*third, board.done, 1),
    );

    ensure!(
        matches!(moved_first?, MoveOutcome::Settled(_)),
        "first move not settled"
    );
    ensure!(
        matches!(moved_third?, MoveOutcome::Settled(_)),
        "second move not settled"
    );
    for column in [board.todo, board.done] {
        ensure!(
            session.snapshot().task_ids(column) == board.server.column(column)?,
            "client and server disagree on {column}"
        );
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn responses_may_arrive_in_any_order(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;
    let [first, second, ..] = board.todo_tasks.as_slice() else {
        bail!("expected four seeded tasks");
    };
    board.server.hold_moves(true)?;

    let (moved_first, moved_second, released) = tokio::join!(
        session.move_task(*first, board.done, 0),
        session.move_task(*second, board.done, 0),
        async {
            wait_for_held(&board.server, 2).await?;
            board.server.release_newest_move(None)?;
            board.server.release_oldest_move(None)?;
            Ok::<_, eyre::Report>(())
        },
    );
    released?;

    ensure!(
        matches!(moved_first?, MoveOutcome::Settled(_)),
        "first move not settled"
    );
    ensure!(
        matches!(moved_second?, MoveOutcome::Settled(_)),
        "second move not settled"
    );
    let done = session.snapshot().task_ids(board.done);
    ensure!(
        done.first() == Some(second),
        "latest move should lead the column: {done:?}"
    );
    ensure!(
        done == board.server.column(board.done)?,
        "client and server disagree"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refusing_one_move_leaves_the_other_in_place(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let session = board.open(BoardConfig::default()).await?;
    let [first, second, third, fourth] = board.todo_tasks.as_slice() else {
        bail!("expected four seeded tasks");
    };
    board.server.hold_moves(true)?;

    let (moved_first, moved_second, released) = tokio::join!(
        session.move_task(*first, board.done, 0),
        session.move_task(*second, board.done, 5),
        async {
            wait_for_held(&board.server, 2).await?;
            let refused = board
                .server
                .release_oldest_move(Some(GatewayError::Rejected("column locked".to_owned())))?;
            board.server.release_oldest_move(None)?;
            Ok::<_, eyre::Report>(refused.map(|request| request.task_id))
        },
    );

    ensure!(released? == Some(*first), "unexpected release order");
    let Err(refusal) = moved_first else {
        bail!("refused move reported success");
    };
    ensure!(
        refusal.kind() == FailureKind::Conflict,
        "refusal classified as {:?}",
        refusal.kind()
    );
    ensure!(
        matches!(moved_second?, MoveOutcome::Settled(_)),
        "surviving move not settled"
    );

    let todo = session.snapshot().task_ids(board.todo);
    ensure!(
        todo == [*first, *third, *fourth],
        "refused task not restored: {todo:?}"
    );
    let done = session.snapshot().task_ids(board.done);
    ensure!(done.last() == Some(second), "surviving move lost: {done:?}");
    for column in [board.todo, board.done] {
        ensure!(
            session.snapshot().task_ids(column) == board.server.column(column)?,
            "client and server disagree on {column}"
        );
    }
    Ok(())
}
