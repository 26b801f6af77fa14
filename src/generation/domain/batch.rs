//! Generation batches and their proposals.

use super::{GenerationDomainError, ParseBatchStateError};
use crate::board::domain::{Priority, ProjectId, uuid_id};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

uuid_id!(
    /// Batch of proposals produced by one prompt.
    BatchId,
    "batch"
);

/// Lifecycle of a generation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Awaiting a decision.
    Pending,
    /// Proposals were turned into tasks.
    Accepted,
    /// Proposals were discarded.
    Rejected,
}

impl BatchState {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Returns `true` when no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns `true` when the lifecycle allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Rejected)
        )
    }
}

impl TryFrom<&str> for BatchState {
    type Error = ParseBatchStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseBatchStateError(value.to_owned())),
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task suggested by the generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    title: String,
    description: Option<String>,
    priority: Priority,
    estimated_hours: Option<f64>,
}

impl Proposal {
    /// Creates a proposal.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::EmptyProposalTitle`] when the title
    /// is blank.
    pub fn new(title: impl Into<String>, priority: Priority) -> Result<Self, GenerationDomainError> {
        let owned_title = title.into();
        if owned_title.trim().is_empty() {
            return Err(GenerationDomainError::EmptyProposalTitle);
        }
        Ok(Self {
            title: owned_title,
            description: None,
            priority,
            estimated_hours: None,
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the effort estimate.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidEstimate`] for a negative or
    /// non-finite estimate.
    pub fn with_estimated_hours(mut self, hours: f64) -> Result<Self, GenerationDomainError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(GenerationDomainError::InvalidEstimate(hours.to_string()));
        }
        self.estimated_hours = Some(hours);
        Ok(self)
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the suggested priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the effort estimate in hours, if any.
    #[must_use]
    pub const fn estimated_hours(&self) -> Option<f64> {
        self.estimated_hours
    }
}

/// Which proposals of a batch to accept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProposalSelection {
    /// Every proposal, in batch order.
    #[default]
    All,
    /// The proposals at these indices.
    Indices(Vec<usize>),
}

impl ProposalSelection {
    /// Selects the given indices.
    #[must_use]
    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::Indices(indices.into_iter().collect())
    }
}

/// Parameter object for reconstructing a batch returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationBatchData {
    /// Server-assigned identifier.
    pub id: BatchId,
    /// Project the proposals are for.
    pub project_id: ProjectId,
    /// Prompt the proposals were generated from.
    pub prompt: String,
    /// Proposals in model order.
    pub proposals: Vec<Proposal>,
    /// Lifecycle state.
    pub state: BatchState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Proposals produced by one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationBatch {
    id: BatchId,
    project_id: ProjectId,
    prompt: String,
    proposals: Vec<Proposal>,
    state: BatchState,
    created_at: DateTime<Utc>,
}

impl GenerationBatch {
    /// Creates a pending batch.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::EmptyPrompt`] when the prompt is
    /// blank.
    pub fn new(
        project_id: ProjectId,
        prompt: impl Into<String>,
        proposals: Vec<Proposal>,
        clock: &impl Clock,
    ) -> Result<Self, GenerationDomainError> {
        let trimmed = validate_prompt(prompt)?;
        Ok(Self {
            id: BatchId::new(),
            project_id,
            prompt: trimmed,
            proposals,
            state: BatchState::Pending,
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a batch from server data.
    #[must_use]
    pub fn from_data(data: GenerationBatchData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            prompt: data.prompt,
            proposals: data.proposals,
            state: data.state,
            created_at: data.created_at,
        }
    }

    /// Returns the batch identifier.
    #[must_use]
    pub const fn id(&self) -> BatchId {
        self.id
    }

    /// Returns the project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the proposals in model order.
    #[must_use]
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BatchState {
        self.state
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Resolves a selection into distinct proposal indices, in the order
    /// given.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::EmptySelection`] when nothing is
    /// selected, [`GenerationDomainError::DuplicateProposal`] when an index
    /// repeats, and [`GenerationDomainError::ProposalOutOfRange`] when an
    /// index has no proposal.
    pub fn select(&self, selection: &ProposalSelection) -> Result<Vec<usize>, GenerationDomainError> {
        let count = self.proposals.len();
        let indices = match selection {
            ProposalSelection::All => (0..count).collect(),
            ProposalSelection::Indices(indices) => indices.clone(),
        };
        if indices.is_empty() {
            return Err(GenerationDomainError::EmptySelection);
        }
        let mut seen = BTreeSet::new();
        for &index in &indices {
            if index >= count {
                return Err(GenerationDomainError::ProposalOutOfRange { index, count });
            }
            if !seen.insert(index) {
                return Err(GenerationDomainError::DuplicateProposal(index));
            }
        }
        Ok(indices)
    }

    /// Marks the batch accepted.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidTransition`] unless the batch
    /// is pending.
    pub fn accept(&mut self) -> Result<(), GenerationDomainError> {
        self.transition_to(BatchState::Accepted)
    }

    /// Marks the batch rejected.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationDomainError::InvalidTransition`] unless the batch
    /// is pending.
    pub fn reject(&mut self) -> Result<(), GenerationDomainError> {
        self.transition_to(BatchState::Rejected)
    }

    fn transition_to(&mut self, next: BatchState) -> Result<(), GenerationDomainError> {
        if !self.state.can_transition_to(next) {
            return Err(GenerationDomainError::InvalidTransition {
                batch_id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Trims and checks a prompt before it is submitted.
///
/// # Errors
///
/// Returns [`GenerationDomainError::EmptyPrompt`] when the prompt is blank.
pub fn validate_prompt(prompt: impl Into<String>) -> Result<String, GenerationDomainError> {
    let owned: String = prompt.into();
    let trimmed = owned.trim();
    if trimmed.is_empty() {
        return Err(GenerationDomainError::EmptyPrompt);
    }
    Ok(trimmed.to_owned())
}
