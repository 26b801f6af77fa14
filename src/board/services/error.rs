//! Service-level error taxonomy for board synchronization.

use crate::board::{domain::BoardValidationError, ports::GatewayError};
use thiserror::Error;

/// Coarse failure category surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transport-level failure; retry via reload.
    Fetch,
    /// Rejected locally before any request was sent.
    Validation,
    /// The server refused the change.
    Conflict,
}

/// Errors returned by board registries and the drag controller.
#[derive(Debug, Clone, Error)]
pub enum BoardSyncError {
    /// Validation failed before any request was sent.
    #[error(transparent)]
    Validation(#[from] BoardValidationError),

    /// The request did not reach the server or timed out.
    #[error("board fetch failed: {0}")]
    Fetch(GatewayError),

    /// The server refused the change.
    #[error("server rejected the change: {0}")]
    Conflict(GatewayError),

    /// The shared board state lock was poisoned by a panicking writer.
    #[error("board state unavailable: {0}")]
    StatePoisoned(String),
}

impl From<GatewayError> for BoardSyncError {
    fn from(err: GatewayError) -> Self {
        if err.is_conflict() {
            Self::Conflict(err)
        } else {
            Self::Fetch(err)
        }
    }
}

impl BoardSyncError {
    /// Classifies any gateway error as a fetch failure.
    ///
    /// Loads are always retryable, whatever the server answered.
    #[must_use]
    pub const fn fetch(err: GatewayError) -> Self {
        Self::Fetch(err)
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Conflict(_) => FailureKind::Conflict,
            Self::Fetch(_) | Self::StatePoisoned(_) => FailureKind::Fetch,
        }
    }

    /// Returns `true` when retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    /// Returns `true` when the local board may have drifted from the server
    /// and should be reloaded.
    #[must_use]
    pub const fn reload_recommended(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

/// Result type for board service operations.
pub type BoardSyncResult<T> = Result<T, BoardSyncError>;
