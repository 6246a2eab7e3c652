//! Serialized posterior-draw bundle
//!
//! The model-fitting step is external; it hands over its draws in this shape
//! (JSON), one entry per key with the draw dimension outermost:
//!
//! ```json
//! {
//!   "num_draws": 2,
//!   "num_buckets": 3,
//!   "policy": [
//!     { "player": 201939, "context": "three_open",
//!       "probs": [[[0.4, 0.4, 0.2], [0.3, 0.5, 0.2], [0.2, 0.5, 0.3]],
//!                 [[0.5, 0.3, 0.2], [0.3, 0.4, 0.3], [0.2, 0.6, 0.2]]] }
//!   ],
//!   "transition": [
//!     { "player": 201939, "context": "three_open", "action": "pass",
//!       "targets": [{ "state": { "player": 201142, "context": "mid_open" } }, "turnover"],
//!       "probs": [[0.9, 0.1], [0.85, 0.15]] }
//!   ],
//!   "reward": [
//!     { "player": 201939, "context": "three_open", "make_prob": [0.43, 0.41] }
//!   ]
//! }
//! ```

use super::tables::{ActionProbs, PolicyTable, RewardTable, TransitionTable};
use super::PolicyError;
use crate::models::{Action, Context, PlayerId, StateKey, Target};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub player: PlayerId,
    pub context: Context,
    /// `[draw][bucket]` action probabilities
    pub probs: Vec<Vec<ActionProbs>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub player: PlayerId,
    pub context: Context,
    pub action: Action,
    pub targets: Vec<Target>,
    /// `[draw][target]` probabilities
    pub probs: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub player: PlayerId,
    pub context: Context,
    /// Make probability per draw
    pub make_prob: Vec<f64>,
}

/// All three parameter families of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorDraws {
    pub num_draws: usize,
    pub num_buckets: usize,
    #[serde(default)]
    pub policy: Vec<PolicyEntry>,
    #[serde(default)]
    pub transition: Vec<TransitionEntry>,
    #[serde(default)]
    pub reward: Vec<RewardEntry>,
}

impl PosteriorDraws {
    pub fn policy_table(&self) -> Result<PolicyTable, PolicyError> {
        let mut table = PolicyTable::new(self.num_draws, self.num_buckets);
        for entry in &self.policy {
            table.insert(StateKey::new(entry.player, entry.context), entry.probs.clone())?;
        }
        Ok(table)
    }

    pub fn transition_table(&self) -> Result<TransitionTable, PolicyError> {
        let mut table = TransitionTable::new(self.num_draws);
        for entry in &self.transition {
            table.insert(
                StateKey::new(entry.player, entry.context),
                entry.action,
                entry.targets.clone(),
                entry.probs.clone(),
            )?;
        }
        Ok(table)
    }

    pub fn reward_table(&self) -> Result<RewardTable, PolicyError> {
        let mut table = RewardTable::new(self.num_draws);
        for entry in &self.reward {
            table.insert(StateKey::new(entry.player, entry.context), entry.make_prob.clone())?;
        }
        Ok(table)
    }
}
