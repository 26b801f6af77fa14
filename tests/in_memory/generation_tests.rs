//! Prompt to task materialization against the in-memory server.

use std::sync::Arc;

use crate::in_memory::helpers::{SeededServer, seeded};
use eyre::{Result, ensure, eyre};
use rstest::rstest;
use std::time::Duration;
use trellis::board::{domain::Priority, services::BoardConfig};
use trellis::generation::{
    domain::{BatchState, Proposal, ProposalSelection},
    services::GenerationMaterializer,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accepted_proposals_appear_in_the_first_column(seeded: Result<SeededServer>) -> Result<()> {
    let board = seeded?;
    let proposals = vec![
        Proposal::new("Write changelog", Priority::High)?.with_description("Cover every fix"),
        Proposal::new("Tag release", Priority::Urgent)?.with_estimated_hours(0.5)?,
    ];
    board.server.script_proposals(proposals)?;
    let session = board.open(BoardConfig::default()).await?;
    let materializer = GenerationMaterializer::new(
        Arc::new(board.server.clone()),
        session.tasks().clone(),
        BoardConfig::default(),
    );
    let mut snapshots = session.subscribe();

    let batch = materializer
        .submit_prompt(board.project_id, "ship version two")
        .await?;
    ensure!(batch.prompt() == "ship version two", "prompt not kept");
    ensure!(
        session.snapshot().task_ids(board.todo) == board.todo_tasks,
        "submitting changed the board"
    );

    let created = materializer
        .accept(board.project_id, batch.id(), &ProposalSelection::All)
        .await?;
    tokio::time::timeout(Duration::from_secs(1), snapshots.changed()).await??;

    ensure!(created == 2, "created {created}");
    let snapshot = session.snapshot();
    let column = snapshot
        .column(board.todo)
        .ok_or_else(|| eyre!("first column missing"))?;
    let titles: Vec<&str> = column.tasks().iter().map(|task| task.title()).collect();
    ensure!(
        titles.ends_with(&["Write changelog", "Tag release"]),
        "new tasks not appended: {titles:?}"
    );
    let server_batch = board
        .server
        .batch(batch.id())?
        .ok_or_else(|| eyre!("server lost the batch"))?;
    ensure!(
        server_batch.state() == BatchState::Accepted,
        "server batch still {}",
        server_batch.state()
    );
    Ok(())
}
