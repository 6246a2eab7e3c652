//! Run reports
//!
//! Summaries of simulated totals per (team, policy variant), the observed
//! score for comparison, and a serialisable report tagged with a run id and
//! a hash of the configuration that produced it.

use super::driver::{SimulationConfig, SimulationError, SimulationRun};
use crate::models::TeamId;
use crate::policy::PerturbationRule;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Distribution summary of simulated totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub iterations: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
}

impl SimulationSummary {
    /// `None` for an empty sequence
    ///
    /// ```
    /// use possession_sim_core::orchestrator::SimulationSummary;
    ///
    /// let summary = SimulationSummary::from_totals(&[90.0, 100.0, 110.0]).unwrap();
    /// assert_eq!(summary.mean, 100.0);
    /// assert_eq!(summary.p50, 100.0);
    /// ```
    pub fn from_totals(totals: &[f64]) -> Option<Self> {
        if totals.is_empty() {
            return None;
        }
        let mut sorted = totals.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = if sorted.len() > 1 {
            sorted.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };

        Some(Self {
            iterations: sorted.len(),
            mean,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p05: quantile(&sorted, 0.05),
            p50: quantile(&sorted, 0.50),
            p95: quantile(&sorted, 0.95),
        })
    }
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Fraction of simulated totals at or below `observed`
pub fn percentile_rank(totals: &[f64], observed: f64) -> Option<f64> {
    if totals.is_empty() {
        return None;
    }
    let at_or_below = totals.iter().filter(|t| **t <= observed).count();
    Some(at_or_below as f64 / totals.len() as f64)
}

/// Result of one policy variant for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub name: String,
    /// Rules that turned the baseline into this variant (empty for the baseline)
    pub rules: Vec<PerturbationRule>,
    pub summary: Option<SimulationSummary>,
    pub failed_rollouts: usize,
    /// Where the observed score falls among the simulated totals
    pub observed_percentile: Option<f64>,
    pub totals: Vec<f64>,
}

impl VariantResult {
    pub fn new(
        name: impl Into<String>,
        rules: Vec<PerturbationRule>,
        run: SimulationRun,
        observed_points: Option<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            rules,
            summary: SimulationSummary::from_totals(&run.totals),
            failed_rollouts: run.failed_rollouts,
            observed_percentile: observed_points
                .and_then(|points| percentile_rank(&run.totals, f64::from(points))),
            totals: run.totals,
        }
    }
}

/// All variants simulated for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub team: TeamId,
    pub plays: usize,
    pub observed_points: Option<u32>,
    pub variants: Vec<VariantResult>,
}

/// Complete run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: String,
    /// SHA-256 of the canonical configuration and rule set
    pub config_hash: String,
    pub config: SimulationConfig,
    pub teams: Vec<TeamResult>,
}

impl SimulationReport {
    pub fn new(
        config: SimulationConfig,
        rules: &[PerturbationRule],
        teams: Vec<TeamResult>,
    ) -> Result<Self, SimulationError> {
        let config_hash = compute_config_hash(&(&config, rules))?;
        Ok(Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            config_hash,
            config,
            teams,
        })
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimulationError::InvalidConfig(format!("report serialization failed: {}", e)))
    }
}

/// Compute SHA256 hash of a serialisable configuration
///
/// Object keys are sorted before hashing so the digest only depends on
/// content.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config)
        .map_err(|e| SimulationError::InvalidConfig(format!("config serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SimulationError::InvalidConfig(format!("config serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
