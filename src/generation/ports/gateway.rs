//! Remote generation collaborator port.

use crate::board::{domain::ProjectId, ports::GatewayResult};
use crate::generation::domain::{BatchId, GenerationBatch};
use async_trait::async_trait;

/// Server-side generation operations.
///
/// The model behind `submit_generation` is opaque; only the batch it returns
/// matters to the client.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generates a pending batch of proposals from a prompt.
    async fn submit_generation(
        &self,
        project_id: ProjectId,
        prompt: &str,
    ) -> GatewayResult<GenerationBatch>;

    /// Creates one task per selected proposal and marks the batch accepted,
    /// atomically.
    async fn accept_generation(
        &self,
        project_id: ProjectId,
        batch_id: BatchId,
        proposal_indices: &[usize],
    ) -> GatewayResult<()>;
}
