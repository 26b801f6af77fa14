//! Error types for generation batches.

use super::{BatchId, BatchState};
use crate::board::domain::ProjectId;
use thiserror::Error;

/// Validation and lifecycle failures for generation batches.
///
/// Every variant is raised before any request is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationDomainError {
    /// The prompt is empty after trimming.
    #[error("generation prompt must not be empty")]
    EmptyPrompt,

    /// A proposal has an empty title.
    #[error("proposal title must not be empty")]
    EmptyProposalTitle,

    /// A proposal estimate is negative or not a number.
    #[error("invalid estimate {0}, expected a non-negative number of hours")]
    InvalidEstimate(String),

    /// The batch is not known locally.
    #[error("generation batch {0} is not known")]
    UnknownBatch(BatchId),

    /// The batch belongs to another project.
    #[error("generation batch {batch_id} belongs to project {owner}, not {requested}")]
    ProjectMismatch {
        /// Batch named by the request.
        batch_id: BatchId,
        /// Project the batch was generated for.
        owner: ProjectId,
        /// Project named by the request.
        requested: ProjectId,
    },

    /// The selection names no proposal.
    #[error("at least one proposal must be selected")]
    EmptySelection,

    /// The selection names a proposal twice.
    #[error("proposal {0} is selected more than once")]
    DuplicateProposal(usize),

    /// The selection names a proposal the batch does not have.
    #[error("proposal {index} is out of range for a batch of {count}")]
    ProposalOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of proposals in the batch.
        count: usize,
    },

    /// The batch already left the pending state.
    #[error("generation batch {batch_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Batch named by the request.
        batch_id: BatchId,
        /// Current state.
        from: BatchState,
        /// Requested state.
        to: BatchState,
    },

    /// An accept request for the batch has not completed yet.
    #[error("generation batch {0} is already being accepted")]
    AcceptInFlight(BatchId),
}

/// Error returned while parsing batch states from the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown generation batch state: {0}")]
pub struct ParseBatchStateError(pub String);
