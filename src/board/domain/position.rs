//! Column ranking and gap-based insertion.
//!
//! Positions are sparse ranks: a task dropped between two neighbours takes the
//! midpoint of their positions. Once the gap between neighbours falls below
//! the configured minimum the whole column is re-spaced before insertion, so
//! repeated reorders never exhaust floating-point precision.
#![expect(
    clippy::float_arithmetic,
    reason = "positions are sparse floating-point ranks by definition"
)]

use super::{BoardValidationError, TaskId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparable rank of a task within its column, or of a column on the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Position(f64);

impl Position {
    /// Creates a validated position.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::InvalidPosition`] when the value is
    /// NaN or infinite.
    pub fn new(value: f64) -> Result<Self, BoardValidationError> {
        if !value.is_finite() {
            return Err(BoardValidationError::InvalidPosition(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Returns the underlying rank.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Total ordering over positions.
    #[must_use]
    pub fn cmp_rank(self, other: Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Position {
    type Error = BoardValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Position> for f64 {
    fn from(position: Position) -> Self {
        position.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spacing rules used when ranking inserted and renumbered entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSpacing {
    step: f64,
    min_gap: f64,
}

impl PositionSpacing {
    /// Creates spacing rules.
    ///
    /// Non-positive or non-finite inputs fall back to the defaults, and the
    /// minimum gap never exceeds half of the step.
    #[must_use]
    pub fn new(step: f64, min_gap: f64) -> Self {
        let defaults = Self::default();
        let valid_step = if step.is_finite() && step > 0.0 {
            step
        } else {
            defaults.step
        };
        let valid_gap = if min_gap.is_finite() && min_gap > 0.0 {
            min_gap.min(valid_step / 2.0)
        } else {
            defaults.min_gap
        };
        Self {
            step: valid_step,
            min_gap: valid_gap,
        }
    }

    /// Distance between consecutive positions after renumbering.
    #[must_use]
    pub const fn step(self) -> f64 {
        self.step
    }

    /// Smallest gap tolerated between neighbouring positions.
    #[must_use]
    pub const fn min_gap(self) -> f64 {
        self.min_gap
    }

    /// Position used for the first entry of an empty column.
    #[must_use]
    pub const fn initial(self) -> Position {
        Position(self.step)
    }

    /// Position placed one step after `last`, if it keeps the minimum gap.
    #[must_use]
    pub fn after(self, last: Position) -> Option<Position> {
        self.checked(last.0 + self.step, Some(last.0), None)
    }

    /// Position placed one step before `first`, if it keeps the minimum gap.
    #[must_use]
    pub fn before(self, first: Position) -> Option<Position> {
        self.checked(first.0 - self.step, None, Some(first.0))
    }

    /// Midpoint between two neighbours, if it keeps the minimum gap to both.
    #[must_use]
    pub fn between(self, lower: Position, upper: Position) -> Option<Position> {
        let midpoint = lower.0 + (upper.0 - lower.0) / 2.0;
        self.checked(midpoint, Some(lower.0), Some(upper.0))
    }

    /// Sequential positions `step, 2*step, ...` for `count` entries.
    #[must_use]
    pub fn sequence(self, count: usize) -> Vec<Position> {
        let mut next = self.step;
        let mut positions = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(Position(next));
            next += self.step;
        }
        positions
    }

    fn checked(self, candidate: f64, lower: Option<f64>, upper: Option<f64>) -> Option<Position> {
        if !candidate.is_finite() {
            return None;
        }
        let clears_lower = lower.is_none_or(|bound| candidate - bound >= self.min_gap);
        let clears_upper = upper.is_none_or(|bound| bound - candidate >= self.min_gap);
        (clears_lower && clears_upper).then_some(Position(candidate))
    }
}

impl Default for PositionSpacing {
    fn default() -> Self {
        Self {
            step: 1.0,
            min_gap: 1e-6,
        }
    }
}

/// Result of ranking an entry into a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Rank assigned to the inserted entry.
    pub position: Position,
    /// Index the entry occupies in the column after insertion.
    pub index: usize,
    /// New ranks for existing entries when the column had to be re-spaced.
    pub renumbered: Vec<(TaskId, Position)>,
}

/// Ranks an entry at `index` within `column`.
///
/// `column` holds the existing entries in display order, excluding the entry
/// being placed. `index` is clamped to the column length. When no position
/// keeps the minimum gap to the destination neighbours, every entry of the
/// column is re-spaced sequentially and the inserted entry takes its slot in
/// the new sequence.
#[must_use]
pub fn place(column: &[(TaskId, Position)], index: usize, spacing: PositionSpacing) -> Placement {
    let slot = index.min(column.len());
    let lower = slot.checked_sub(1).and_then(|prior| column.get(prior));
    let upper = column.get(slot);

    let candidate = match (lower, upper) {
        (None, None) => Some(spacing.initial()),
        (Some(&(_, below)), None) => spacing.after(below),
        (None, Some(&(_, above))) => spacing.before(above),
        (Some(&(_, below)), Some(&(_, above))) => spacing.between(below, above),
    };

    if let Some(position) = candidate {
        return Placement {
            position,
            index: slot,
            renumbered: Vec::new(),
        };
    }

    renumber_around(column, slot, spacing)
}

fn renumber_around(
    column: &[(TaskId, Position)],
    slot: usize,
    spacing: PositionSpacing,
) -> Placement {
    let mut sequence = spacing.sequence(column.len() + 1).into_iter();
    let mut renumbered = Vec::with_capacity(column.len());
    let mut position = spacing.initial();

    for (offset, &(task_id, _)) in column.iter().enumerate() {
        if offset == slot {
            position = sequence.next().unwrap_or(position);
        }
        if let Some(next) = sequence.next() {
            renumbered.push((task_id, next));
        }
    }
    if slot >= column.len() {
        position = sequence.next().unwrap_or(position);
    }

    Placement {
        position,
        index: slot,
        renumbered,
    }
}

/// Ranks `incoming` entries after the existing entries of `column`.
///
/// Returns the new rank of every entry that changes. When the column has no
/// room left after its last entry, existing entries are re-spaced as well.
#[must_use]
pub fn append(
    column: &[(TaskId, Position)],
    incoming: &[TaskId],
    spacing: PositionSpacing,
) -> Vec<(TaskId, Position)> {
    let mut ranks = Vec::with_capacity(incoming.len());
    let mut last = column.last().map(|&(_, position)| position);

    for &task_id in incoming {
        let next = last.map_or_else(|| Some(spacing.initial()), |prior| spacing.after(prior));
        let Some(position) = next else {
            let everyone = column
                .iter()
                .map(|&(existing, _)| existing)
                .chain(incoming.iter().copied());
            return everyone
                .zip(spacing.sequence(column.len() + incoming.len()))
                .collect();
        };
        ranks.push((task_id, position));
        last = Some(position);
    }
    ranks
}
