//! [`GenerationGateway`] for the in-memory board server.
//!
//! Batches live next to the server's tasks so that accepting one creates
//! tasks the board can fetch straight away.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::board::{
    adapters::memory::{GatewayOperation, InMemoryBoardServer, ServerState},
    domain::{Priority, ProjectId, Task, TaskData, TaskId},
    ports::{EntityKind, GatewayError, GatewayResult},
};
use crate::generation::{
    domain::{
        BatchId, BatchState, GenerationBatch, GenerationBatchData, Proposal, validate_prompt,
    },
    ports::GenerationGateway,
};

fn default_proposals(prompt: &str) -> GatewayResult<Vec<Proposal>> {
    let proposal = Proposal::new(prompt, Priority::default())
        .map_err(|err| GatewayError::Rejected(err.to_string()))?;
    Ok(vec![proposal])
}

fn check_acceptable(
    state: &ServerState,
    project_id: ProjectId,
    batch_id: BatchId,
    proposal_indices: &[usize],
) -> GatewayResult<GenerationBatch> {
    let batch = state
        .batches
        .get(&batch_id)
        .ok_or_else(|| GatewayError::not_found(EntityKind::Batch, batch_id))?;
    if batch.project_id() != project_id {
        return Err(GatewayError::Rejected(format!(
            "batch {batch_id} belongs to another project"
        )));
    }
    if batch.state() != BatchState::Pending {
        return Err(GatewayError::Rejected(format!(
            "batch {batch_id} is already {}",
            batch.state()
        )));
    }
    let count = batch.proposals().len();
    if let Some(&index) = proposal_indices.iter().find(|&&index| index >= count) {
        return Err(GatewayError::Rejected(format!(
            "proposal {index} is out of range for a batch of {count}"
        )));
    }
    Ok(batch.clone())
}

#[async_trait]
impl GenerationGateway for InMemoryBoardServer {
    async fn submit_generation(
        &self,
        project_id: ProjectId,
        prompt: &str,
    ) -> GatewayResult<GenerationBatch> {
        self.call(GatewayOperation::SubmitGeneration).await?;
        let trimmed =
            validate_prompt(prompt).map_err(|err| GatewayError::Rejected(err.to_string()))?;
        let created_at = self.now();
        let mut state = self.write()?;
        let proposals = state
            .scripted_proposals
            .pop_front()
            .map_or_else(|| default_proposals(&trimmed), Ok)?;
        let batch = GenerationBatch::from_data(GenerationBatchData {
            id: BatchId::new(),
            project_id,
            prompt: trimmed,
            proposals,
            state: BatchState::Pending,
            created_at,
        });
        state.batches.insert(batch.id(), batch.clone());
        Ok(batch)
    }

    async fn accept_generation(
        &self,
        project_id: ProjectId,
        batch_id: BatchId,
        proposal_indices: &[usize],
    ) -> GatewayResult<()> {
        self.call(GatewayOperation::AcceptGeneration).await?;
        let at = self.now();
        let mut state = self.write()?;
        let mut batch = check_acceptable(&state, project_id, batch_id, proposal_indices)?;
        let status_id = state
            .ordered_statuses(project_id)
            .first()
            .map(|status| status.id())
            .ok_or_else(|| GatewayError::Rejected("project has no status".to_owned()))?;

        for proposal in proposal_indices
            .iter()
            .filter_map(|&index| batch.proposals().get(index))
        {
            let task = Task::from_data(TaskData {
                id: TaskId::new(),
                project_id,
                title: proposal.title().to_owned(),
                description: proposal.description().map(str::to_owned),
                status_id,
                priority: proposal.priority(),
                position: state.next_task_position(status_id),
                due_date: None,
                completed_at: None,
                assignees: BTreeSet::new(),
                created_at: at,
                updated_at: at,
            });
            state.tasks.insert(task.id(), task);
        }
        batch
            .accept()
            .map_err(|err| GatewayError::Rejected(err.to_string()))?;
        state.batches.insert(batch_id, batch);
        Ok(())
    }
}
