//! Counterfactual shot-policy alteration
//!
//! A rule multiplies one action's probability at a set of (player, context)
//! keys and clock buckets, then rescales each touched row so it sums to 1
//! again. The untouched actions absorb the complement proportionally.
//!
//! Rules are applied in the order given; every row is renormalised right
//! after its multiplication, before the next rule runs. Every draw receives
//! the same factors.

use super::tables::PolicyTable;
use super::PolicyError;
use crate::models::{Action, StateKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// One policy alteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationRule {
    pub targets: Vec<StateKey>,
    pub clock_buckets: Vec<usize>,
    /// Positive multiplier for the action's probability
    pub factor: f64,
    /// Action whose probability is scaled
    #[serde(default)]
    pub action: Action,
}

impl PerturbationRule {
    /// Scale the shooting probability of `targets` in `clock_buckets`
    pub fn shoot(targets: Vec<StateKey>, clock_buckets: Vec<usize>, factor: f64) -> Self {
        Self {
            targets,
            clock_buckets,
            factor,
            action: Action::Shoot,
        }
    }

    fn validate(&self, theta: &PolicyTable) -> Result<(), PolicyError> {
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(PolicyError::InvalidRule(format!(
                "factor must be positive and finite, got {}",
                self.factor
            )));
        }
        for bucket in &self.clock_buckets {
            theta.check_bucket(*bucket)?;
        }
        if let Some(missing) = self.targets.iter().find(|k| !theta.contains_key(k)) {
            return Err(PolicyError::UnknownKey(*missing));
        }
        Ok(())
    }
}

/// Altered copy of `theta`; `theta` itself is never modified.
///
/// All rules are validated before any row is touched, so an unknown key or
/// bad bucket fails the whole call without producing a partial result.
///
/// # Example
///
/// ```
/// use possession_sim_core::policy::{perturb, PerturbationRule, PolicyTable};
/// use possession_sim_core::models::{PlayerId, StateKey};
///
/// let key = StateKey::new(PlayerId(30), "three_open".parse().unwrap());
/// let mut theta = PolicyTable::new(1, 1);
/// theta.insert(key, vec![vec![[0.25, 0.5, 0.25]]]).unwrap();
///
/// let doubled = perturb(&theta, &[PerturbationRule::shoot(vec![key], vec![0], 3.0)]).unwrap();
/// let row = doubled.get(&key, 0, 0).unwrap();
/// assert!((row[0] - 0.5).abs() < 1e-12);
/// assert!((row[1] - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub fn perturb(theta: &PolicyTable, rules: &[PerturbationRule]) -> Result<PolicyTable, PolicyError> {
    for rule in rules {
        rule.validate(theta)?;
    }

    let mut altered = theta.clone();
    for (i, rule) in rules.iter().enumerate() {
        // A factor of exactly one leaves rows bit-for-bit unchanged
        if rule.factor == 1.0 {
            debug!(rule = i, "skipping no-op perturbation rule");
            continue;
        }
        let targets: BTreeSet<&StateKey> = rule.targets.iter().collect();
        let buckets: BTreeSet<usize> = rule.clock_buckets.iter().copied().collect();
        let column = rule.action.index();

        for key in &targets {
            for draw in 0..altered.num_draws() {
                for bucket in &buckets {
                    let row = altered
                        .get_mut(key, *bucket, draw)
                        .ok_or(PolicyError::UnknownKey(**key))?;
                    row[column] *= rule.factor;
                    let total: f64 = row.iter().sum();
                    if !total.is_finite() || total <= 0.0 {
                        return Err(PolicyError::InvalidDistribution {
                            key: **key,
                            detail: format!("row sums to {} after rule {}", total, i),
                        });
                    }
                    row.iter_mut().for_each(|p| *p /= total);
                }
            }
        }
        debug!(
            rule = i,
            action = %rule.action,
            factor = rule.factor,
            keys = targets.len(),
            buckets = buckets.len(),
            "applied perturbation rule"
        );
    }
    Ok(altered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayerId;

    fn key(player: u32, ctx: &str) -> StateKey {
        StateKey::new(PlayerId(player), ctx.parse().unwrap())
    }

    fn theta() -> PolicyTable {
        let mut table = PolicyTable::new(2, 2);
        table
            .insert(
                key(1, "long2_open"),
                vec![
                    vec![[0.2, 0.6, 0.2], [0.4, 0.4, 0.2]],
                    vec![[0.1, 0.8, 0.1], [0.5, 0.25, 0.25]],
                ],
            )
            .unwrap();
        table
    }

    #[test]
    fn test_untargeted_bucket_unchanged() {
        let theta = theta();
        let rule = PerturbationRule::shoot(vec![key(1, "long2_open")], vec![1], 0.5);
        let altered = perturb(&theta, &[rule]).unwrap();
        assert_eq!(
            altered.get(&key(1, "long2_open"), 0, 0).unwrap(),
            theta.get(&key(1, "long2_open"), 0, 0).unwrap()
        );
        let row = altered.get(&key(1, "long2_open"), 1, 0).unwrap();
        // 0.4 * 0.5 = 0.2 over total 0.8
        assert!((row[0] - 0.25).abs() < 1e-12);
        assert!((row[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_factor_rejected() {
        let rule = PerturbationRule::shoot(vec![key(1, "long2_open")], vec![0], 0.0);
        assert!(matches!(
            perturb(&theta(), &[rule]).unwrap_err(),
            PolicyError::InvalidRule(_)
        ));
    }

    #[test]
    fn test_bucket_out_of_range_rejected() {
        let rule = PerturbationRule::shoot(vec![key(1, "long2_open")], vec![2], 2.0);
        assert_eq!(
            perturb(&theta(), &[rule]).unwrap_err(),
            PolicyError::BucketOutOfRange {
                bucket: 2,
                num_buckets: 2
            }
        );
    }

    #[test]
    fn test_rules_apply_in_order() {
        let k = key(1, "long2_open");
        let a = PerturbationRule::shoot(vec![k], vec![0], 2.0);
        let b = PerturbationRule {
            targets: vec![k],
            clock_buckets: vec![0],
            factor: 3.0,
            action: Action::Pass,
        };
        let ab = perturb(&theta(), &[a.clone(), b.clone()]).unwrap();
        let ba = perturb(&theta(), &[b, a]).unwrap();
        // Sequential renormalisation of disjoint columns commutes up to rounding
        let (x, y) = (ab.get(&k, 0, 0).unwrap(), ba.get(&k, 0, 0).unwrap());
        for i in 0..3 {
            assert!((x[i] - y[i]).abs() < 1e-12);
        }
        // draw 0 bucket 0: [0.2,0.6,0.2] -> shoot x2 -> [0.4,0.6,0.2]/1.2 -> pass x3
        let expected_pass = (0.6 / 1.2) * 3.0;
        let total = 0.4 / 1.2 + expected_pass + 0.2 / 1.2;
        assert!((x[1] - expected_pass / total).abs() < 1e-12);
    }
}
