//! Ordering configuration.

use super::BoardDomainError;
use serde::Deserialize;

/// Configuration for order key generation.
///
/// `step` is the gap left when a task is appended or prepended to a lane
/// and the spacing applied when a lane is renormalized. `baseline` is the
/// key given to the first task in an empty lane.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Gap between neighbouring keys produced by appends and renormalization.
    pub step: f64,
    /// Key assigned when a task lands in an empty lane.
    pub baseline: f64,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            step: 1024.0,
            baseline: 1024.0,
        }
    }
}

impl OrderingConfig {
    /// Creates a configuration with unit spacing.
    ///
    /// Matches servers that store task order as consecutive integers.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            step: 1.0,
            baseline: 1.0,
        }
    }

    /// Checks that the configuration can produce strictly increasing keys.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidOrderingConfig`] when `step` is not
    /// a positive finite number or `baseline` is not finite.
    pub fn validate(&self) -> Result<(), BoardDomainError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(BoardDomainError::InvalidOrderingConfig(format!(
                "step must be positive and finite, got {}",
                self.step
            )));
        }
        if !self.baseline.is_finite() {
            return Err(BoardDomainError::InvalidOrderingConfig(format!(
                "baseline must be finite, got {}",
                self.baseline
            )));
        }
        Ok(())
    }
}
