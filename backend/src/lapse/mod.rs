//! Empirical shot-clock time lapses
//!
//! Builds, for every clock phase, the multiset of observed gaps between an
//! event and the next event of the same play. Sampling draws uniformly from
//! that multiset.
//!
//! # Empty buckets
//!
//! A phase with no observations cannot be sampled directly. Raw access
//! (`observations`) reports `LapseError::EmptyBucket`; `sample` borrows the
//! nearest non-empty phase instead (ties go to the lower phase). Only a model
//! with no observations at all is rejected.
//!
//! # Example
//!
//! ```
//! use possession_sim_core::{ClockPhases, RngStream, TimeLapseModel};
//!
//! let phases = ClockPhases::uniform(24.0, 2).unwrap();
//! let model = TimeLapseModel::from_buckets(phases, vec![vec![1.5], vec![2.0, 3.0]]).unwrap();
//!
//! let mut rng = RngStream::new(7);
//! assert_eq!(model.sample(0, &mut rng), 1.5);
//! ```

use crate::core::ClockPhases;
use crate::models::EventRecord;
use crate::rng::RngStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LapseError {
    #[error("No time lapses observed in clock bucket {bucket}")]
    EmptyBucket { bucket: usize },

    #[error("No usable time lapses observed in any clock bucket")]
    NoObservations,

    #[error("Expected {expected} lapse buckets, got {actual}")]
    BucketCountMismatch { expected: usize, actual: usize },

    #[error("Lapses must be positive and finite, got {0}")]
    InvalidLapse(f64),

    #[error("Clock bucket {bucket} out of range (num_buckets = {num_buckets})")]
    BucketOutOfRange { bucket: usize, num_buckets: usize },
}

/// Empirical lapse distribution per clock phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLapseModel {
    phases: ClockPhases,
    buckets: Vec<Vec<f64>>,
    /// Bucket actually sampled for each phase (itself when non-empty)
    source: Vec<usize>,
}

impl TimeLapseModel {
    /// Fit the model from the event log.
    ///
    /// Events without a lapse (last event of a play) are ignored, as are
    /// non-positive lapses: a zero gap would never move the clock. A lapse
    /// recorded on a play-ending event (shot or turnover) is not a gap
    /// between decisions and is skipped too.
    pub fn estimate(history: &[EventRecord], phases: ClockPhases) -> Result<Self, LapseError> {
        let mut buckets = vec![Vec::new(); phases.num_buckets()];
        let mut skipped = 0usize;

        for record in history {
            let Some(lapse) = record.lapse else { continue };
            if record.event.is_terminal() || !lapse.is_finite() || lapse <= 0.0 {
                skipped += 1;
                continue;
            }
            match phases.bucket(record.shot_clock) {
                Ok(bucket) => buckets[bucket].push(lapse),
                Err(_) => skipped += 1,
            }
        }

        debug!(
            events = history.len(),
            skipped,
            per_bucket = ?buckets.iter().map(Vec::len).collect::<Vec<_>>(),
            "estimated time-lapse distribution"
        );
        Self::build(phases, buckets)
    }

    /// Model from explicit per-bucket lapse multisets
    pub fn from_buckets(phases: ClockPhases, buckets: Vec<Vec<f64>>) -> Result<Self, LapseError> {
        if buckets.len() != phases.num_buckets() {
            return Err(LapseError::BucketCountMismatch {
                expected: phases.num_buckets(),
                actual: buckets.len(),
            });
        }
        if let Some(bad) = buckets
            .iter()
            .flatten()
            .find(|l| !l.is_finite() || **l <= 0.0)
        {
            return Err(LapseError::InvalidLapse(*bad));
        }
        Self::build(phases, buckets)
    }

    fn build(phases: ClockPhases, buckets: Vec<Vec<f64>>) -> Result<Self, LapseError> {
        let non_empty: Vec<usize> = (0..buckets.len())
            .filter(|b| !buckets[*b].is_empty())
            .collect();
        if non_empty.is_empty() {
            return Err(LapseError::NoObservations);
        }

        let source = (0..buckets.len())
            .map(|b| {
                if !buckets[b].is_empty() {
                    return b;
                }
                // min_by_key keeps the first minimum, so ties go to the lower bucket
                let nearest = non_empty
                    .iter()
                    .copied()
                    .min_by_key(|n| n.abs_diff(b))
                    .unwrap_or(b);
                warn!(bucket = b, borrowed_from = nearest, "empty lapse bucket");
                nearest
            })
            .collect();

        Ok(Self {
            phases,
            buckets,
            source,
        })
    }

    /// Raw lapse multiset of a bucket
    pub fn observations(&self, bucket: usize) -> Result<&[f64], LapseError> {
        let lapses = self.buckets.get(bucket).ok_or(LapseError::BucketOutOfRange {
            bucket,
            num_buckets: self.buckets.len(),
        })?;
        if lapses.is_empty() {
            return Err(LapseError::EmptyBucket { bucket });
        }
        Ok(lapses)
    }

    /// Bucket whose observations are used when sampling `bucket`
    pub fn source_bucket(&self, bucket: usize) -> usize {
        self.source[bucket.min(self.source.len() - 1)]
    }

    /// Draw one lapse for a clock bucket. Out-of-range buckets clamp to the last one.
    pub fn sample(&self, bucket: usize, rng: &mut RngStream) -> f64 {
        let lapses = &self.buckets[self.source_bucket(bucket)];
        lapses[rng.index(lapses.len())]
    }

    /// Smallest lapse the model can produce
    pub fn min_lapse(&self) -> f64 {
        self.buckets
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    pub fn phases(&self) -> &ClockPhases {
        &self.phases
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Per-bucket (count, mean) of the raw observations
    pub fn bucket_stats(&self) -> Vec<(usize, Option<f64>)> {
        self.buckets
            .iter()
            .map(|lapses| {
                let mean = (!lapses.is_empty())
                    .then(|| lapses.iter().sum::<f64>() / lapses.len() as f64);
                (lapses.len(), mean)
            })
            .collect()
    }
}
