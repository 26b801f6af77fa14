//! Tunables for board synchronization.

use crate::board::domain::PositionSpacing;
use serde::Deserialize;
use std::time::Duration;

/// Configuration shared by the registries and the drag controller.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trellis::board::services::BoardConfig;
///
/// let config = BoardConfig::default();
/// assert_eq!(config.request_timeout(), Duration::from_secs(30));
///
/// let impatient = BoardConfig::default().with_request_timeout(Duration::from_millis(250));
/// assert_eq!(impatient.request_timeout_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Distance between consecutive ranks after a column is re-spaced.
    pub position_step: f64,
    /// Smallest gap tolerated between neighbouring ranks before re-spacing.
    pub min_position_gap: f64,
    /// Milliseconds to wait for any server response before failing it.
    pub request_timeout_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        let spacing = PositionSpacing::default();
        Self {
            position_step: spacing.step(),
            min_position_gap: spacing.min_gap(),
            request_timeout_ms: 30_000,
        }
    }
}

impl BoardConfig {
    /// Creates a configuration with a short response timeout.
    ///
    /// Useful for local wiring and tests where a silent server should be
    /// rolled back quickly.
    #[must_use]
    pub fn fast_fail() -> Self {
        Self {
            request_timeout_ms: 2_000,
            ..Self::default()
        }
    }

    /// Parses a configuration document, filling absent keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the document is malformed.
    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(document)
    }

    /// Sets the response timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the rank step and the minimum gap.
    #[must_use]
    pub const fn with_spacing(mut self, step: f64, min_gap: f64) -> Self {
        self.position_step = step;
        self.min_position_gap = min_gap;
        self
    }

    /// Response timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Ranking rules derived from this configuration.
    #[must_use]
    pub fn spacing(&self) -> PositionSpacing {
        PositionSpacing::new(self.position_step, self.min_position_gap)
    }
}
