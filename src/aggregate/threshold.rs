//! Coverage threshold.
//!
//! A single integer percentage. A file or a whole group is "low coverage"
//! when its percentage is strictly below the threshold.

use crate::error::CovError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default minimum coverage percentage.
pub const DEFAULT_THRESHOLD: u32 = 50;

/// Minimum acceptable coverage percentage, in `0..=100`.
///
/// # Example
///
/// ```
/// use covdelta::aggregate::Threshold;
///
/// let threshold = Threshold::new(70).unwrap();
/// assert!(threshold.is_met(70.0));
/// assert!(!threshold.is_met(69.9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Threshold(u32);

impl Threshold {
    /// Create a threshold.
    ///
    /// # Errors
    ///
    /// Returns [`CovError::InvalidConfig`] when `percent` exceeds 100.
    pub fn new(percent: u32) -> Result<Self, CovError> {
        if percent > 100 {
            return Err(CovError::invalid_config(
                "threshold",
                format!("{} is not a percentage (expected 0-100)", percent),
            ));
        }
        Ok(Self(percent))
    }

    /// The threshold as a whole percentage.
    #[must_use]
    pub fn percent(self) -> u32 {
        self.0
    }

    /// Whether `percentage` meets the threshold.
    #[must_use]
    pub fn is_met(self, percentage: f64) -> bool {
        percentage >= f64::from(self.0)
    }

    /// Whether `percentage` counts as low coverage.
    #[must_use]
    pub fn is_low(self, percentage: f64) -> bool {
        !self.is_met(percentage)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<u32> for Threshold {
    type Error = CovError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for u32 {
    fn from(value: Threshold) -> Self {
        value.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
