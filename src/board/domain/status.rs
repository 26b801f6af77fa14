//! Status columns of a board.

use super::{BoardValidationError, Position, ProjectId, StatusId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column color in normalized `#rrggbb` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusColor(String);

impl StatusColor {
    /// Creates a validated color.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::InvalidColor`] unless the value is a
    /// `#` followed by six hexadecimal digits.
    pub fn new(value: impl Into<String>) -> Result<Self, BoardValidationError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let digits = normalized.strip_prefix('#').unwrap_or_default();
        let is_valid = digits.len() == 6 && digits.chars().all(|ch| ch.is_ascii_hexdigit());
        if !is_valid {
            return Err(BoardValidationError::InvalidColor(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the color as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StatusColor {
    type Error = BoardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatusColor> for String {
    fn from(color: StatusColor) -> Self {
        color.0
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Board column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    id: StatusId,
    project_id: ProjectId,
    name: String,
    color: StatusColor,
    position: Position,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a status returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusData {
    /// Server-assigned identifier.
    pub id: StatusId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Column title.
    pub name: String,
    /// Column color.
    pub color: StatusColor,
    /// Rank of the column on the board.
    pub position: Position,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Status {
    /// Reconstructs a status from server data.
    #[must_use]
    pub fn from_data(data: StatusData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            name: data.name,
            color: data.color,
            position: data.position,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the status identifier.
    #[must_use]
    pub const fn id(&self) -> StatusId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the column title.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column color.
    #[must_use]
    pub const fn color(&self) -> &StatusColor {
        &self.color
    }

    /// Returns the rank of the column on the board.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn apply_patch(&mut self, patch: &StatusPatch, at: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        self.updated_at = at;
    }
}

/// Fields for a status to be created by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStatus {
    name: String,
    color: StatusColor,
    position: Option<Position>,
}

impl NewStatus {
    /// Creates a draft appended after the last column.
    #[must_use]
    pub fn new(name: impl Into<String>, color: StatusColor) -> Self {
        Self {
            name: name.into(),
            color,
            position: None,
        }
    }

    /// Places the column at an explicit rank.
    #[must_use]
    pub const fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns the column title.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column color.
    #[must_use]
    pub const fn color(&self) -> &StatusColor {
        &self.color
    }

    /// Returns the explicit rank, if any.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    /// Checks the draft before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::EmptyStatusName`] when the name is
    /// blank.
    pub fn validate(&self) -> Result<(), BoardValidationError> {
        if self.name.trim().is_empty() {
            return Err(BoardValidationError::EmptyStatusName);
        }
        Ok(())
    }
}

/// Partial edit of a status column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPatch {
    name: Option<String>,
    color: Option<StatusColor>,
    position: Option<Position>,
}

impl StatusPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the column.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Recolors the column.
    #[must_use]
    pub fn with_color(mut self, color: StatusColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Moves the column to another rank.
    #[must_use]
    pub const fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns the new name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the new color, if set.
    #[must_use]
    pub const fn color(&self) -> Option<&StatusColor> {
        self.color.as_ref()
    }

    /// Returns the new rank, if set.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    /// Checks the patch before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`BoardValidationError::EmptyPatch`] for a patch without
    /// fields, or [`BoardValidationError::EmptyStatusName`] for a blank name.
    pub fn validate(&self) -> Result<(), BoardValidationError> {
        if self.name.is_none() && self.color.is_none() && self.position.is_none() {
            return Err(BoardValidationError::EmptyPatch);
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(BoardValidationError::EmptyStatusName);
        }
        Ok(())
    }
}
