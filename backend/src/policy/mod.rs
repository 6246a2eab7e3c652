//! Posterior parameter store
//!
//! Holds the three families of posterior draws produced by the (external)
//! model fit and answers the lookups the rollout engine needs:
//!
//! - `policy`: action probabilities of a (player, context) in a clock bucket
//! - `transition`: next-target distribution after a pass or dribble
//! - `reward_prob`: make probability of a shot state
//!
//! Tables are immutable once built and shared through `Arc`, so a store can
//! be cloned into every worker without copying and a perturbed variant
//! (`perturbed`) shares the transition and reward tables with its baseline.
//!
//! # Example
//!
//! ```
//! use possession_sim_core::policy::{PolicyStore, PolicyTable, RewardTable, TransitionTable};
//! use possession_sim_core::models::{PlayerId, StateKey};
//!
//! let shooter = StateKey::new(PlayerId(11), "mid_open".parse().unwrap());
//! let mut policy = PolicyTable::new(1, 1);
//! policy.insert(shooter, vec![vec![[1.0, 0.0, 0.0]]]).unwrap();
//! let mut reward = RewardTable::new(1);
//! reward.insert(shooter, vec![0.45]).unwrap();
//!
//! let store = PolicyStore::new(policy, TransitionTable::new(1), reward).unwrap();
//! assert_eq!(store.reward_prob(&shooter, 0).unwrap(), 0.45);
//! assert_eq!(store.policy(&shooter, 0, 0).unwrap(), &[1.0, 0.0, 0.0]);
//! ```

pub mod draws;
pub mod perturb;
pub mod tables;

pub use draws::{PolicyEntry, PosteriorDraws, RewardEntry, TransitionEntry};
pub use perturb::{perturb, PerturbationRule};
pub use tables::{ActionProbs, PolicyTable, RewardTable, TransitionTable, TransitionView, LOAD_TOLERANCE};

use crate::models::{Action, Context, ShotKind, StateKey};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors building or querying parameter tables
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Unknown policy key: {0}")]
    UnknownKey(StateKey),

    #[error("No transition row for {key} after {action}")]
    UnknownTransition { key: StateKey, action: Action },

    #[error("Duplicate table key: {0}")]
    DuplicateKey(StateKey),

    #[error("Invalid probability distribution at {key}: {detail}")]
    InvalidDistribution { key: StateKey, detail: String },

    #[error("Malformed table entry at {key}: {detail}")]
    ShapeMismatch { key: StateKey, detail: String },

    #[error("Draw index {draw} out of range (num_draws = {num_draws})")]
    DrawOutOfRange { draw: usize, num_draws: usize },

    #[error("Clock bucket {bucket} out of range (num_buckets = {num_buckets})")]
    BucketOutOfRange { bucket: usize, num_buckets: usize },

    #[error("Parameter families disagree: {0}")]
    InconsistentDraws(String),

    #[error("No {table} entry for {key} (referenced from {needed_by})")]
    MissingEntry {
        table: &'static str,
        key: StateKey,
        needed_by: StateKey,
    },

    #[error("Invalid perturbation rule: {0}")]
    InvalidRule(String),
}

/// Read-only view over one fitted model's posterior draws
#[derive(Debug, Clone)]
pub struct PolicyStore {
    policy: Arc<PolicyTable>,
    transition: Arc<TransitionTable>,
    reward: Arc<RewardTable>,
}

impl PolicyStore {
    /// Combine the three families; they must agree on the number of draws
    pub fn new(
        policy: PolicyTable,
        transition: TransitionTable,
        reward: RewardTable,
    ) -> Result<Self, PolicyError> {
        let n = policy.num_draws();
        if n == 0 {
            return Err(PolicyError::InconsistentDraws(
                "at least one posterior draw is required".to_string(),
            ));
        }
        if transition.num_draws() != n || reward.num_draws() != n {
            return Err(PolicyError::InconsistentDraws(format!(
                "policy has {} draws, transition {}, reward {}",
                n,
                transition.num_draws(),
                reward.num_draws()
            )));
        }
        let store = Self {
            policy: Arc::new(policy),
            transition: Arc::new(transition),
            reward: Arc::new(reward),
        };
        store.validate_references()?;
        Ok(store)
    }

    /// Every lookup a rollout can reach from a policy row must resolve:
    ///
    /// - shot states carry a make probability (chosen or forced shot)
    /// - pass/dribble mass has a transition row
    /// - every next state has a policy row
    fn validate_references(&self) -> Result<(), PolicyError> {
        for key in self.policy.keys() {
            if key.context.shot_kind().is_some() && !self.reward.contains_key(&key) {
                return Err(PolicyError::MissingEntry {
                    table: "reward",
                    key,
                    needed_by: key,
                });
            }
            for action in [Action::Pass, Action::Dribble] {
                if self.policy.has_mass(&key, action) && !self.transition.contains(&key, action) {
                    return Err(PolicyError::UnknownTransition { key, action });
                }
            }
        }
        for (source, next) in self.transition.state_links() {
            if !self.policy.contains_key(&next) {
                return Err(PolicyError::MissingEntry {
                    table: "policy",
                    key: next,
                    needed_by: source,
                });
            }
        }
        Ok(())
    }

    /// Every non-shooting state needs a make probability for `forced_shot`,
    /// the shot taken when the clock expires on it
    pub fn check_forced_shot(&self, forced_shot: ShotKind) -> Result<(), PolicyError> {
        for key in self.policy.keys() {
            if key.context.shot_kind().is_some() {
                continue;
            }
            let shooter = StateKey::new(key.player, Context::Shot(forced_shot));
            if !self.reward.contains_key(&shooter) {
                return Err(PolicyError::MissingEntry {
                    table: "reward",
                    key: shooter,
                    needed_by: key,
                });
            }
        }
        Ok(())
    }

    /// Validate and index a serialized draw bundle
    pub fn from_draws(draws: &PosteriorDraws) -> Result<Self, PolicyError> {
        let store = Self::new(
            draws.policy_table()?,
            draws.transition_table()?,
            draws.reward_table()?,
        )?;
        debug!(
            num_draws = store.num_draws(),
            num_buckets = store.num_buckets(),
            policy_keys = store.policy.len(),
            transitions = store.transition.len(),
            shot_states = store.reward.len(),
            "loaded posterior draws"
        );
        Ok(store)
    }

    /// Same transition and reward tables, altered shot policy
    pub fn perturbed(&self, rules: &[PerturbationRule]) -> Result<Self, PolicyError> {
        Ok(Self {
            policy: Arc::new(perturb(&self.policy, rules)?),
            transition: Arc::clone(&self.transition),
            reward: Arc::clone(&self.reward),
        })
    }

    /// Action probabilities `[Shoot, Pass, Dribble]`
    pub fn policy(&self, key: &StateKey, bucket: usize, draw: usize) -> Result<&ActionProbs, PolicyError> {
        self.policy.get(key, bucket, draw)
    }

    /// Next-target distribution after a pass or dribble
    pub fn transition(&self, key: &StateKey, action: Action, draw: usize) -> Result<TransitionView<'_>, PolicyError> {
        self.transition.get(key, action, draw)
    }

    /// Make probability of a shot state
    pub fn reward_prob(&self, key: &StateKey, draw: usize) -> Result<f64, PolicyError> {
        self.reward.get(key, draw)
    }

    pub fn num_draws(&self) -> usize {
        self.policy.num_draws()
    }

    pub fn num_buckets(&self) -> usize {
        self.policy.num_buckets()
    }

    pub fn policy_table(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn transition_table(&self) -> &TransitionTable {
        &self.transition
    }

    pub fn reward_table(&self) -> &RewardTable {
        &self.reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_counts_must_agree() {
        let err = PolicyStore::new(PolicyTable::new(2, 1), TransitionTable::new(2), RewardTable::new(3))
            .unwrap_err();
        assert!(matches!(err, PolicyError::InconsistentDraws(_)));
    }

    #[test]
    fn test_zero_draws_rejected() {
        let err = PolicyStore::new(PolicyTable::new(0, 1), TransitionTable::new(0), RewardTable::new(0))
            .unwrap_err();
        assert!(matches!(err, PolicyError::InconsistentDraws(_)));
    }

    #[test]
    fn test_perturbed_shares_other_tables() {
        let store = PolicyStore::new(PolicyTable::new(1, 1), TransitionTable::new(1), RewardTable::new(1))
            .unwrap();
        let variant = store.perturbed(&[]).unwrap();
        assert!(Arc::ptr_eq(&store.transition, &variant.transition));
        assert!(Arc::ptr_eq(&store.reward, &variant.reward));
    }
}
