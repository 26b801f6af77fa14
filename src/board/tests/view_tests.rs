//! Unit tests for the board projection.

use super::support::{status, task};
use crate::board::{
    domain::{MemberId, Priority, ProjectId, StatusId, StatusSet, TaskPatch, TaskSet},
    services::{BoardFilter, BoardView},
};
use eyre::{Result, ensure};
use rstest::rstest;

#[rstest]
fn projection_orders_columns_and_tasks_by_rank() -> Result<()> {
    let project_id = ProjectId::new();
    let later = status(project_id, "Done", 5.0)?;
    let first = status(project_id, "To Do", 1.0)?;
    let second = task(project_id, first.id(), "second", 2.0)?;
    let leading = task(project_id, first.id(), "first", 0.5)?;
    let tasks = TaskSet::from_tasks([second.clone(), leading.clone()]);
    let statuses = StatusSet::from_statuses([later.clone(), first.clone()]);

    let snapshot = BoardView::project(Some(project_id), 3, &tasks, &statuses);

    let names: Vec<&str> = snapshot
        .statuses_ordered()
        .into_iter()
        .map(|column| column.name())
        .collect();
    ensure!(names == ["To Do", "Done"], "column order {names:?}");
    ensure!(
        snapshot.task_ids(first.id()) == vec![leading.id(), second.id()],
        "task order"
    );
    ensure!(snapshot.task_ids(later.id()).is_empty(), "done column empty");
    ensure!(snapshot.revision() == 3, "revision carried");
    ensure!(
        snapshot.locate(second.id()) == Some((first.id(), 1)),
        "second task located"
    );
    Ok(())
}

#[rstest]
fn tasks_in_unknown_columns_are_reported_unplaced() -> Result<()> {
    let project_id = ProjectId::new();
    let known = status(project_id, "To Do", 1.0)?;
    let stray = task(project_id, StatusId::new(), "stray", 1.0)?;
    let tasks = TaskSet::from_tasks([stray.clone()]);
    let statuses = StatusSet::from_statuses([known]);

    let snapshot = BoardView::project(Some(project_id), 0, &tasks, &statuses);

    ensure!(snapshot.unplaced() == [stray.clone()], "stray task hidden");
    ensure!(snapshot.locate(stray.id()).is_none(), "stray task placed");
    Ok(())
}

#[rstest]
fn column_ranks_can_exclude_the_moving_task() -> Result<()> {
    let project_id = ProjectId::new();
    let column = status(project_id, "To Do", 1.0)?;
    let a = task(project_id, column.id(), "A", 1.0)?;
    let b = task(project_id, column.id(), "B", 2.0)?;
    let tasks = TaskSet::from_tasks([a.clone(), b.clone()]);

    let ranks = BoardView::column_ranks(&tasks, column.id(), Some(a.id()));

    ensure!(ranks == vec![(b.id(), b.position())], "ranks {ranks:?}");
    ensure!(
        BoardView::locate(&tasks, b.id()) == Some((column.id(), 1)),
        "b located"
    );
    Ok(())
}

#[rstest]
fn filter_combines_criteria_and_keeps_empty_columns() -> Result<()> {
    let project_id = ProjectId::new();
    let column = status(project_id, "To Do", 1.0)?;
    let member = MemberId::new();
    let mut urgent = task(project_id, column.id(), "Fix login", 1.0)?;
    urgent.apply_patch(&TaskPatch::new().with_priority(Priority::Urgent), urgent.updated_at());
    urgent.assign(&[member], urgent.updated_at());
    let routine = task(project_id, column.id(), "Tidy docs", 2.0)?;
    let snapshot = BoardView::project(
        Some(project_id),
        1,
        &TaskSet::from_tasks([urgent.clone(), routine]),
        &StatusSet::from_statuses([column.clone()]),
    );

    let by_member = snapshot.filtered(&BoardFilter::new().with_assignee(member));
    ensure!(by_member.task_ids(column.id()) == vec![urgent.id()], "member filter");

    let by_text = snapshot.filtered(
        &BoardFilter::new()
            .with_text("LOGIN")
            .with_priorities([Priority::Urgent, Priority::High]),
    );
    ensure!(by_text.task_ids(column.id()) == vec![urgent.id()], "text filter");

    let nothing = snapshot.filtered(&BoardFilter::new().with_priorities([Priority::Low]));
    ensure!(nothing.columns().len() == 1, "empty column dropped");
    ensure!(nothing.task_ids(column.id()).is_empty(), "low filter matched");
    Ok(())
}
