//! Then steps for board move BDD scenarios.

use super::world::{BoardWorld, names};
use rstest_bdd_macros::then;
use trellis::board::{
    domain::BoardValidationError,
    services::{BoardSyncError, BoardSyncResult, FailureKind, MoveOutcome},
};

fn last_move(world: &BoardWorld) -> Result<&BoardSyncResult<MoveOutcome>, eyre::Report> {
    world
        .last_move
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing move result"))
}

fn move_failure_kind(world: &BoardWorld) -> Result<FailureKind, eyre::Report> {
    match last_move(world)? {
        Ok(outcome) => Err(eyre::eyre!("expected a failed move, got {outcome:?}")),
        Err(err) => Ok(err.kind()),
    }
}

#[then("the move settles")]
fn move_settles(world: &BoardWorld) -> Result<(), eyre::Report> {
    let result = last_move(world)?;
    if !matches!(result, Ok(MoveOutcome::Settled(_))) {
        return Err(eyre::eyre!("expected a settled move, got {result:?}"));
    }
    Ok(())
}

#[then("the move fails as a conflict")]
fn move_fails_as_conflict(world: &BoardWorld) -> Result<(), eyre::Report> {
    let kind = move_failure_kind(world)?;
    if kind != FailureKind::Conflict {
        return Err(eyre::eyre!("expected a conflict, got {kind:?}"));
    }
    Ok(())
}

#[then("the move fails as a fetch failure")]
fn move_fails_as_fetch_failure(world: &BoardWorld) -> Result<(), eyre::Report> {
    let kind = move_failure_kind(world)?;
    if kind != FailureKind::Fetch {
        return Err(eyre::eyre!("expected a fetch failure, got {kind:?}"));
    }
    Ok(())
}

#[then(r#"column "{column}" lists "{list}""#)]
fn column_lists(world: &BoardWorld, column: String, list: String) -> Result<(), eyre::Report> {
    let status_id = world.column(&column)?;
    let expected = names(&list)
        .iter()
        .map(|title| world.task(title))
        .collect::<Result<Vec<_>, _>>()?;
    let actual = world.session()?.snapshot().task_ids(status_id);
    if actual != expected {
        return Err(eyre::eyre!(
            "column {column} holds {actual:?}, expected {list}"
        ));
    }
    Ok(())
}

#[then("the deletion is refused because the column still has {count:usize} tasks")]
fn deletion_refused(world: &BoardWorld, count: usize) -> Result<(), eyre::Report> {
    let result = world
        .last_delete
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing delete result"))?;
    if !matches!(
        result,
        Err(BoardSyncError::Validation(BoardValidationError::StatusNotEmpty { task_count, .. }))
            if *task_count == count
    ) {
        return Err(eyre::eyre!("expected StatusNotEmpty, got {result:?}"));
    }
    Ok(())
}

#[then("{count:usize} tasks were migrated")]
fn tasks_were_migrated(world: &BoardWorld, count: usize) -> Result<(), eyre::Report> {
    let result = world
        .last_delete
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing delete result"))?;
    if !matches!(result, Ok(migrated) if *migrated == count) {
        return Err(eyre::eyre!("expected {count} migrated tasks, got {result:?}"));
    }
    Ok(())
}

#[then("the board has {count:usize} column")]
fn board_has_columns(world: &BoardWorld, count: usize) -> Result<(), eyre::Report> {
    let columns = world.session()?.snapshot().columns().len();
    if columns != count {
        return Err(eyre::eyre!("board has {columns} columns, expected {count}"));
    }
    Ok(())
}
