//! Shot-clock phases
//!
//! The shot clock is continuous, but policy and time-lapse tables are indexed
//! by a small number of ordered phases. `ClockPhases` holds the interior
//! boundaries of a partition of `[0, duration]`:
//!
//! ```text
//! bucket 0: [0, b1)   bucket 1: [b1, b2)   ...   bucket n-1: [b(n-1), duration]
//! ```
//!
//! Bucket 0 is the end of the possession (little time left); the last bucket
//! is the start. Values above `duration` fall into the last bucket.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// League shot-clock duration in seconds
pub const DEFAULT_SHOT_CLOCK: f64 = 24.0;

/// Remaining clock at or below this many seconds counts as expired
pub const CLOCK_EPSILON: f64 = 1e-9;

/// Errors building phases or classifying a clock value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhaseError {
    #[error("Shot-clock duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    #[error("At least one clock bucket is required")]
    NoBuckets,

    #[error("Bucket boundaries must be strictly increasing inside (0, {duration}): {boundaries:?}")]
    InvalidBoundaries { duration: f64, boundaries: Vec<f64> },

    #[error("Invalid shot-clock value: {0}")]
    InvalidClock(f64),
}

/// Ordered partition of the shot clock into phase buckets
///
/// # Example
/// ```
/// use possession_sim_core::ClockPhases;
///
/// let phases = ClockPhases::uniform(24.0, 3).unwrap();
/// assert_eq!(phases.num_buckets(), 3);
/// assert_eq!(phases.bucket(2.0).unwrap(), 0);
/// assert_eq!(phases.bucket(12.0).unwrap(), 1);
/// assert_eq!(phases.bucket(24.0).unwrap(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockPhases {
    duration: f64,
    /// Interior boundaries, strictly increasing, all in (0, duration)
    boundaries: Vec<f64>,
}

impl ClockPhases {
    /// Equal-width buckets over `[0, duration]`
    pub fn uniform(duration: f64, num_buckets: usize) -> Result<Self, PhaseError> {
        if num_buckets == 0 {
            return Err(PhaseError::NoBuckets);
        }
        let width = duration / num_buckets as f64;
        let boundaries = (1..num_buckets).map(|i| width * i as f64).collect();
        Self::from_boundaries(duration, boundaries)
    }

    /// Buckets whose interior boundaries sit at empirical quantiles of `values`.
    ///
    /// Falls back to equal widths when the quantiles collapse (too few
    /// distinct observations to separate the buckets).
    pub fn quantile(values: &[f64], num_buckets: usize, duration: f64) -> Result<Self, PhaseError> {
        if num_buckets == 0 {
            return Err(PhaseError::NoBuckets);
        }
        let mut sorted: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(duration))
            .collect();
        if sorted.is_empty() {
            return Self::uniform(duration, num_buckets);
        }
        sorted.sort_by(f64::total_cmp);

        let boundaries: Vec<f64> = (1..num_buckets)
            .map(|i| {
                let pos = (i * sorted.len()) / num_buckets;
                sorted[pos.min(sorted.len() - 1)]
            })
            .collect();

        match Self::from_boundaries(duration, boundaries) {
            Ok(phases) => Ok(phases),
            Err(PhaseError::InvalidBoundaries { .. }) => {
                tracing::warn!(
                    num_buckets,
                    observations = sorted.len(),
                    "quantile boundaries collapsed; using equal-width clock buckets"
                );
                Self::uniform(duration, num_buckets)
            }
            Err(e) => Err(e),
        }
    }

    /// Explicit interior boundaries
    pub fn from_boundaries(duration: f64, boundaries: Vec<f64>) -> Result<Self, PhaseError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(PhaseError::InvalidDuration(duration));
        }
        let in_range = boundaries.iter().all(|b| b.is_finite() && *b > 0.0 && *b < duration);
        let increasing = boundaries.windows(2).all(|w| w[0] < w[1]);
        if !in_range || !increasing {
            return Err(PhaseError::InvalidBoundaries { duration, boundaries });
        }
        Ok(Self { duration, boundaries })
    }

    /// Bucket index for a clock value
    pub fn bucket(&self, clock: f64) -> Result<usize, PhaseError> {
        if !clock.is_finite() || clock < 0.0 {
            return Err(PhaseError::InvalidClock(clock));
        }
        Ok(self.boundaries.partition_point(|b| *b <= clock))
    }

    pub fn num_buckets(&self) -> usize {
        self.boundaries.len() + 1
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// `[lower, upper)` range of a bucket (the last bucket's upper end is `duration`)
    pub fn range(&self, bucket: usize) -> Option<(f64, f64)> {
        if bucket >= self.num_buckets() {
            return None;
        }
        let lower = if bucket == 0 { 0.0 } else { self.boundaries[bucket - 1] };
        let upper = self.boundaries.get(bucket).copied().unwrap_or(self.duration);
        Some((lower, upper))
    }
}

impl Default for ClockPhases {
    fn default() -> Self {
        Self {
            duration: DEFAULT_SHOT_CLOCK,
            boundaries: vec![8.0, 16.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_buckets_rejected() {
        assert_eq!(ClockPhases::uniform(24.0, 0), Err(PhaseError::NoBuckets));
    }

    #[test]
    fn test_single_bucket_covers_everything() {
        let phases = ClockPhases::uniform(24.0, 1).unwrap();
        assert_eq!(phases.bucket(0.0).unwrap(), 0);
        assert_eq!(phases.bucket(24.0).unwrap(), 0);
        assert_eq!(phases.bucket(30.0).unwrap(), 0);
    }

    #[test]
    fn test_boundary_value_goes_to_upper_bucket() {
        let phases = ClockPhases::default();
        assert_eq!(phases.bucket(7.999).unwrap(), 0);
        assert_eq!(phases.bucket(8.0).unwrap(), 1);
        assert_eq!(phases.bucket(16.0).unwrap(), 2);
    }

    #[test]
    fn test_negative_clock_rejected() {
        let phases = ClockPhases::default();
        assert_eq!(phases.bucket(-0.1), Err(PhaseError::InvalidClock(-0.1)));
        assert!(phases.bucket(f64::NAN).is_err());
    }
}
