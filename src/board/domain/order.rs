//! Order keys and key generation between neighbours.

use super::{BoardDomainError, OrderingConfig};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Real-valued key establishing a task's position within its lane.
///
/// Keys are always finite, so `total_cmp` gives a total order that agrees
/// with numeric comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct OrderKey(f64);

impl OrderKey {
    /// Creates an order key.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidOrderKey`] for NaN or infinite values.
    pub fn new(value: f64) -> Result<Self, BoardDomainError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(BoardDomainError::InvalidOrderKey(value))
        }
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns a key strictly between `lower` and `upper`.
    ///
    /// A missing bound is treated as the lane boundary: the key is placed one
    /// configured step beyond the other bound, or at the baseline when the
    /// lane is empty.
    ///
    /// # Errors
    ///
    /// Returns [`OrderExhaustion`] when no representable key lies strictly
    /// between the bounds.
    #[expect(
        clippy::float_arithmetic,
        reason = "order keys are real-valued midpoints"
    )]
    pub fn between(
        lower: Option<Self>,
        upper: Option<Self>,
        config: &OrderingConfig,
    ) -> Result<Self, OrderExhaustion> {
        let exhausted = OrderExhaustion {
            lower: lower.map(Self::value),
            upper: upper.map(Self::value),
        };
        let candidate = match (lower, upper) {
            (None, None) => config.baseline,
            (Some(low), None) => low.0 + config.step,
            (None, Some(high)) => high.0 - config.step,
            (Some(low), Some(high)) => low.0 + (high.0 - low.0) / 2.0,
        };
        let above_lower = lower.is_none_or(|low| candidate > low.0);
        let below_upper = upper.is_none_or(|high| candidate < high.0);
        if candidate.is_finite() && above_lower && below_upper {
            Ok(Self(candidate))
        } else {
            Err(exhausted)
        }
    }

    /// Returns `count` evenly spaced keys starting one step above zero.
    #[expect(
        clippy::float_arithmetic,
        reason = "renormalized keys are multiples of the configured step"
    )]
    pub(crate) fn evenly_spaced(count: usize, config: &OrderingConfig) -> Vec<Self> {
        let mut next = config.step;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(Self(next));
            next += config.step;
        }
        keys
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for OrderKey {
    type Error = BoardDomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderKey> for f64 {
    fn from(key: OrderKey) -> Self {
        key.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// No representable key fits between two neighbours.
///
/// Raised after many insertions into the same gap. The reducer recovers by
/// renormalizing the lane; this error never reaches callers of the tracker.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("no order key fits between {lower:?} and {upper:?}")]
pub struct OrderExhaustion {
    lower: Option<f64>,
    upper: Option<f64>,
}
