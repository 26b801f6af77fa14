//! Domain model for AI-proposed task batches.

mod batch;
mod error;

pub use batch::{
    BatchId, BatchState, GenerationBatch, GenerationBatchData, Proposal, ProposalSelection,
    validate_prompt,
};
pub use error::{GenerationDomainError, ParseBatchStateError};
