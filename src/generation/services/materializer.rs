//! Submits prompts and materializes accepted proposals.

use super::{GenerationError, GenerationResult};
use crate::board::{
    domain::ProjectId,
    ports::BoardGateway,
    services::{BoardConfig, TaskRegistry, within},
};
use crate::generation::{
    domain::{
        BatchId, BatchState, GenerationBatch, GenerationDomainError, ProposalSelection,
        validate_prompt,
    },
    ports::GenerationGateway,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A batch and whether an accept request is still outstanding for it.
#[derive(Debug, Clone)]
struct TrackedBatch {
    batch: GenerationBatch,
    accepting: bool,
}

type BatchTable = HashMap<BatchId, TrackedBatch>;

/// Tracks generation batches and turns accepted ones into tasks.
///
/// Every guard runs before the request is sent: accepting a batch that is no
/// longer pending, or one whose accept has not returned yet, never reaches the
/// server. The board is reloaded after a successful accept so the new tasks
/// appear with their server-assigned ranks.
pub struct GenerationMaterializer<GG, G, C>
where
    GG: GenerationGateway,
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    generation: Arc<GG>,
    tasks: TaskRegistry<G, C>,
    config: BoardConfig,
    batches: Arc<Mutex<BatchTable>>,
}

impl<GG, G, C> Clone for GenerationMaterializer<GG, G, C>
where
    GG: GenerationGateway,
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            generation: Arc::clone(&self.generation),
            tasks: self.tasks.clone(),
            config: self.config.clone(),
            batches: Arc::clone(&self.batches),
        }
    }
}

impl<GG, G, C> GenerationMaterializer<GG, G, C>
where
    GG: GenerationGateway,
    G: BoardGateway,
    C: Clock + Send + Sync,
{
    /// Creates a materializer that reloads `tasks` after each accept.
    #[must_use]
    pub fn new(generation: Arc<GG>, tasks: TaskRegistry<G, C>, config: BoardConfig) -> Self {
        Self {
            generation,
            tasks,
            config,
            batches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a copy of a tracked batch.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::StatePoisoned`] when the batch table lock
    /// is poisoned.
    pub fn batch(&self, batch_id: BatchId) -> GenerationResult<Option<GenerationBatch>> {
        self.with_batches(|batches| batches.get(&batch_id).map(|tracked| tracked.batch.clone()))
    }

    /// Batches still awaiting a decision, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::StatePoisoned`] when the batch table lock
    /// is poisoned.
    pub fn pending_batches(&self) -> GenerationResult<Vec<GenerationBatch>> {
        let mut pending = self.with_batches(|batches| {
            batches
                .values()
                .filter(|tracked| tracked.batch.state() == BatchState::Pending)
                .map(|tracked| tracked.batch.clone())
                .collect::<Vec<_>>()
        })?;
        pending.sort_by_key(|batch| (batch.created_at(), batch.id()));
        Ok(pending)
    }

    /// Asks the server for proposals. The board is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::EmptyPrompt`] without contacting the
    /// server for a blank prompt, and [`GenerationError::Gateway`] when the
    /// request fails.
    pub async fn submit_prompt(
        &self,
        project_id: ProjectId,
        prompt: &str,
    ) -> GenerationResult<GenerationBatch> {
        let trimmed = validate_prompt(prompt)?;
        let batch = within(
            self.config.request_timeout(),
            self.generation.submit_generation(project_id, &trimmed),
        )
        .await?;
        info!(
            batch_id = %batch.id(),
            project_id = %project_id,
            proposals = batch.proposals().len(),
            "generation batch received"
        );
        self.with_batches(|batches| {
            batches.insert(
                batch.id(),
                TrackedBatch {
                    batch: batch.clone(),
                    accepting: false,
                },
            );
        })?;
        Ok(batch)
    }

    /// Creates one task per selected proposal and marks the batch accepted.
    ///
    /// Returns the number of tasks created. The task working set is reloaded
    /// when `project_id` is the loaded project.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationDomainError`] without contacting the server when
    /// the batch is unknown, belongs to another project, is no longer pending,
    /// is already being accepted, or the selection is invalid. On a failed
    /// request the batch stays pending and [`GenerationError::Gateway`] is
    /// returned. A failed reload is returned as [`GenerationError::Board`];
    /// the batch is accepted regardless.
    pub async fn accept(
        &self,
        project_id: ProjectId,
        batch_id: BatchId,
        selection: &ProposalSelection,
    ) -> GenerationResult<usize> {
        let indices = self
            .with_batches(|batches| begin_accept(batches, project_id, batch_id, selection))??;

        let response = within(
            self.config.request_timeout(),
            self.generation.accept_generation(project_id, batch_id, &indices),
        )
        .await;

        if let Err(err) = response {
            self.with_batches(|batches| {
                if let Some(tracked) = batches.get_mut(&batch_id) {
                    tracked.accepting = false;
                }
            })?;
            warn!(batch_id = %batch_id, error = %err, "accept failed; batch left pending");
            return Err(err.into());
        }

        self.with_batches(|batches| {
            batches.get_mut(&batch_id).map_or(Ok(()), |tracked| {
                tracked.accepting = false;
                tracked.batch.accept()
            })
        })??;
        let created = indices.len();
        info!(batch_id = %batch_id, created, "generation batch accepted");

        if self.tasks.store().project_id()? == Some(project_id) {
            self.tasks.load(project_id).await?;
        } else {
            debug!(project_id = %project_id, "accepted batch belongs to an unloaded project");
        }
        Ok(created)
    }

    /// Marks a batch rejected, keeping it so a later accept is refused.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::UnknownBatch`],
    /// [`GenerationDomainError::AcceptInFlight`] or
    /// [`GenerationDomainError::InvalidTransition`] as appropriate.
    pub fn reject(&self, batch_id: BatchId) -> GenerationResult<()> {
        self.with_batches(|batches| {
            let tracked = settled_entry(batches, batch_id)?;
            tracked.batch.reject()
        })??;
        debug!(batch_id = %batch_id, "generation batch rejected");
        Ok(())
    }

    /// Forgets a batch entirely.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::UnknownBatch`] or
    /// [`GenerationDomainError::AcceptInFlight`].
    pub fn dismiss(&self, batch_id: BatchId) -> GenerationResult<GenerationBatch> {
        let dismissed = self.with_batches(|batches| {
            settled_entry(batches, batch_id)?;
            batches
                .remove(&batch_id)
                .map(|tracked| tracked.batch)
                .ok_or(GenerationDomainError::UnknownBatch(batch_id))
        })??;
        debug!(batch_id = %batch_id, "generation batch dismissed");
        Ok(dismissed)
    }

    fn with_batches<T>(&self, f: impl FnOnce(&mut BatchTable) -> T) -> GenerationResult<T> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|err| GenerationError::StatePoisoned(err.to_string()))?;
        Ok(f(&mut batches))
    }
}

/// Looks up a batch that has no accept outstanding.
fn settled_entry(
    batches: &mut BatchTable,
    batch_id: BatchId,
) -> Result<&mut TrackedBatch, GenerationDomainError> {
    let tracked = batches
        .get_mut(&batch_id)
        .ok_or(GenerationDomainError::UnknownBatch(batch_id))?;
    if tracked.accepting {
        return Err(GenerationDomainError::AcceptInFlight(batch_id));
    }
    Ok(tracked)
}

/// Runs every client-side accept guard and marks the batch as accepting.
fn begin_accept(
    batches: &mut BatchTable,
    project_id: ProjectId,
    batch_id: BatchId,
    selection: &ProposalSelection,
) -> Result<Vec<usize>, GenerationDomainError> {
    let tracked = settled_entry(batches, batch_id)?;
    let owner = tracked.batch.project_id();
    if owner != project_id {
        return Err(GenerationDomainError::ProjectMismatch {
            batch_id,
            owner,
            requested: project_id,
        });
    }
    let state = tracked.batch.state();
    if !state.can_transition_to(BatchState::Accepted) {
        return Err(GenerationDomainError::InvalidTransition {
            batch_id,
            from: state,
            to: BatchState::Accepted,
        });
    }
    let indices = tracked.batch.select(selection)?;
    tracked.accepting = true;
    Ok(indices)
}
