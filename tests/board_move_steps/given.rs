//! Given steps for board move BDD scenarios.

use std::collections::BTreeSet;
use std::time::Duration;

use super::world::{BoardWorld, names, open_session, run_async};
use chrono::Utc;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use trellis::board::{
    adapters::memory::GatewayOperation,
    domain::{
        Priority, Status, StatusColor, StatusData, StatusId, Task, TaskData, TaskId,
    },
    ports::GatewayError,
};

#[given(r#"a project with columns "{list}""#)]
fn project_with_columns(world: &mut BoardWorld, list: String) -> Result<(), eyre::Report> {
    let columns = names(&list);
    let ranks = world.config.spacing().sequence(columns.len());
    for (name, position) in columns.into_iter().zip(ranks) {
        let status = Status::from_data(StatusData {
            id: StatusId::new(),
            project_id: world.project_id,
            name: name.clone(),
            color: StatusColor::new("#5e6ad2")?,
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        world.columns.insert(name, status.id());
        world
            .server
            .seed_status(status)
            .wrap_err("seed column for scenario")?;
    }
    Ok(())
}

#[given(r#"column "{column}" holds tasks "{list}""#)]
fn column_holds_tasks(
    world: &mut BoardWorld,
    column: String,
    list: String,
) -> Result<(), eyre::Report> {
    let status_id = world.column(&column)?;
    let titles = names(&list);
    let ranks = world.config.spacing().sequence(titles.len());
    for (title, position) in titles.into_iter().zip(ranks) {
        let task = Task::from_data(TaskData {
            id: TaskId::new(),
            project_id: world.project_id,
            title: title.clone(),
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
        world.tasks.insert(title, task.id());
        world
            .server
            .seed_task(task)
            .wrap_err("seed task for scenario")?;
    }
    Ok(())
}

#[given("the server refuses the next move")]
fn server_refuses_next_move(world: &mut BoardWorld) -> Result<(), eyre::Report> {
    world
        .server
        .fail_next(
            GatewayOperation::MoveTask,
            GatewayError::Forbidden("board is read-only".to_owned()),
        )
        .wrap_err("script move failure")
}

#[given("requests time out after {millis:u64} milliseconds")]
fn requests_time_out(world: &mut BoardWorld, millis: u64) {
    world.config = world
        .config
        .clone()
        .with_request_timeout(Duration::from_millis(millis));
}

#[given("the server holds moves")]
fn server_holds_moves(world: &mut BoardWorld) -> Result<(), eyre::Report> {
    world
        .server
        .hold_moves(true)
        .wrap_err("hold moves on the server")
}

#[given("the board is loaded")]
fn board_is_loaded(world: &mut BoardWorld) -> Result<(), eyre::Report> {
    let session = open_session(world);
    run_async(session.open(world.project_id)).wrap_err("open board for scenario")?;
    world.session = Some(session);
    Ok(())
}
