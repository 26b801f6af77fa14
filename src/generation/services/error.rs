//! Service-level errors for generation batches.

use crate::board::{
    ports::GatewayError,
    services::{BoardSyncError, FailureKind},
};
use crate::generation::domain::GenerationDomainError;
use thiserror::Error;

/// Errors returned by [`super::GenerationMaterializer`].
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Rejected locally before any request was sent.
    #[error(transparent)]
    Domain(#[from] GenerationDomainError),

    /// The generation request failed or was refused.
    #[error("generation request failed: {0}")]
    Gateway(#[from] GatewayError),

    /// The board reload after an accept failed.
    #[error(transparent)]
    Board(#[from] BoardSyncError),

    /// The batch table lock was poisoned by a panicking writer.
    #[error("generation state unavailable: {0}")]
    StatePoisoned(String),
}

impl GenerationError {
    /// Returns the failure category, using the same buckets as the board.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Domain(_) => FailureKind::Validation,
            Self::Gateway(err) if err.is_conflict() => FailureKind::Conflict,
            Self::Gateway(_) | Self::StatePoisoned(_) => FailureKind::Fetch,
            Self::Board(err) => err.kind(),
        }
    }
}

/// Result type for generation service operations.
pub type GenerationResult<T> = Result<T, GenerationError>;
