//! When steps for board move BDD scenarios.

use super::world::{BoardWorld, run_async};
use rstest_bdd_macros::when;

#[when(r#"task "{title}" is moved to "{column}" at index {index:usize}"#)]
fn task_is_moved(
    world: &mut BoardWorld,
    title: String,
    column: String,
    index: usize,
) -> Result<(), eyre::Report> {
    let task_id = world.task(&title)?;
    let status_id = world.column(&column)?;
    let result = run_async(world.session()?.move_task(task_id, status_id, index));
    world.last_move = Some(result);
    Ok(())
}

#[when(r#"column "{column}" is deleted"#)]
fn column_is_deleted(world: &mut BoardWorld, column: String) -> Result<(), eyre::Report> {
    let status_id = world.column(&column)?;
    let result = run_async(world.session()?.statuses().delete(status_id, None));
    world.last_delete = Some(result);
    Ok(())
}

#[when(r#"column "{column}" is deleted moving its tasks to "{target}""#)]
fn column_is_deleted_with_migration(
    world: &mut BoardWorld,
    column: String,
    target: String,
) -> Result<(), eyre::Report> {
    let status_id = world.column(&column)?;
    let target_id = world.column(&target)?;
    let result = run_async(
        world
            .session()?
            .statuses()
            .delete(status_id, Some(target_id)),
    );
    world.last_delete = Some(result);
    Ok(())
}
