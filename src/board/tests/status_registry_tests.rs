//! Unit tests for column management and task migration.

use super::support::{rank, seeded_board};
use crate::board::{
    adapters::memory::GatewayOperation,
    domain::{BoardValidationError, NewStatus, StatusColor, StatusId, StatusPatch},
    ports::GatewayError,
    services::{BoardConfig, BoardSignal, BoardSyncError},
};
use eyre::{Result, ensure};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_an_occupied_column_requires_a_target() -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;
    let tasks_before = board.session.tasks().tasks()?;
    let statuses_before = board.session.store().statuses()?;

    let result = board.session.statuses().delete(board.todo, None).await;

    ensure!(
        matches!(
            result,
            Err(BoardSyncError::Validation(BoardValidationError::StatusNotEmpty {
                task_count: 2,
                ..
            }))
        ),
        "expected StatusNotEmpty, got {result:?}"
    );
    ensure!(board.session.tasks().tasks()? == tasks_before, "tasks changed");
    ensure!(board.session.store().statuses()? == statuses_before, "columns changed");
    ensure!(
        board.server.call_count(GatewayOperation::DeleteStatus)? == 0,
        "request sent"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_column_migrates_tasks_to_the_target_end() -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;
    let mut signals = board.session.signals();

    let migrated = board.session.statuses().delete(board.todo, Some(board.done)).await?;

    ensure!(migrated == 2, "migrated {migrated}");
    ensure!(
        board.column(board.done) == vec![board.c, board.a, board.b],
        "migrated tasks must follow existing ones in their previous order"
    );
    ensure!(board.session.statuses().status(board.todo)?.is_none(), "column kept");
    ensure!(
        board.server.column(board.done)? == vec![board.c, board.a, board.b],
        "server disagrees"
    );
    ensure!(
        signals.recv().await?
            == BoardSignal::StatusDeleted {
                status_id: board.todo,
                migrated_to: Some(board.done),
                migrated: 2,
            },
        "deletion not signalled"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn last_column_cannot_be_deleted() -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;
    board.session.statuses().delete(board.todo, Some(board.done)).await?;

    let result = board.session.statuses().delete(board.done, None).await;

    ensure!(
        matches!(
            result,
            Err(BoardSyncError::Validation(BoardValidationError::LastStatus(_)))
        ),
        "last column deleted"
    );
    Ok(())
}

#[rstest]
#[case::itself(true)]
#[case::unknown(false)]
#[tokio::test(flavor = "multi_thread")]
async fn migration_target_must_be_another_loaded_column(#[case] itself: bool) -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;
    let target = if itself { board.todo } else { StatusId::new() };

    let result = board.session.statuses().delete(board.todo, Some(target)).await;

    ensure!(
        matches!(
            result,
            Err(BoardSyncError::Validation(BoardValidationError::InvalidMigrationTarget(found)))
                if found == target
        ),
        "expected InvalidMigrationTarget, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_deletion_changes_nothing_locally() -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;
    let tasks_before = board.session.tasks().tasks()?;
    board.server.fail_next(
        GatewayOperation::DeleteStatus,
        GatewayError::Rejected("column locked".to_owned()),
    )?;

    let result = board.session.statuses().delete(board.todo, Some(board.done)).await;

    ensure!(matches!(result, Err(BoardSyncError::Conflict(_))), "expected conflict");
    ensure!(board.session.tasks().tasks()? == tasks_before, "tasks changed");
    ensure!(board.session.statuses().status(board.todo)?.is_some(), "column removed");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn new_columns_are_appended_unless_placed() -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;
    let color = StatusColor::new("#22aa55")?;

    let review = board
        .session
        .statuses()
        .create(board.project_id, NewStatus::new("Review", color.clone()))
        .await?;
    let backlog = board
        .session
        .statuses()
        .create(
            board.project_id,
            NewStatus::new("Backlog", color).with_position(rank(0.5)?),
        )
        .await?;

    let names: Vec<String> = board
        .session
        .statuses()
        .statuses()?
        .iter()
        .map(|column| column.name().to_owned())
        .collect();
    ensure!(
        names == ["Backlog", "To Do", "Done", "Review"],
        "unexpected order {names:?}"
    );
    ensure!(review.position().value() > 2.0, "review not appended");
    ensure!(backlog.position() == rank(0.5)?, "explicit position ignored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn column_edits_round_trip_through_the_server() -> Result<()> {
    let board = seeded_board(BoardConfig::default()).await?;

    let renamed = board
        .session
        .statuses()
        .update(board.done, &StatusPatch::new().with_name("Shipped"))
        .await?;
    ensure!(renamed.name() == "Shipped", "server name");
    ensure!(
        board
            .session
            .snapshot()
            .column(board.done)
            .is_some_and(|column| column.status().name() == "Shipped"),
        "snapshot not updated"
    );

    let unknown = board
        .session
        .statuses()
        .update(StatusId::new(), &StatusPatch::new().with_name("Ghost"))
        .await;
    ensure!(
        matches!(
            unknown,
            Err(BoardSyncError::Validation(BoardValidationError::UnknownStatus(_)))
        ),
        "unknown column edited"
    );
    Ok(())
}
