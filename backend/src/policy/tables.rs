//! Posterior-draw lookup tables
//!
//! Three families, each holding every posterior draw:
//!
//! - `PolicyTable` (theta): (player, context) × draw × clock bucket → action probabilities
//! - `TransitionTable` (mu): (player, context, action) × draw → next-target probabilities
//! - `RewardTable` (xi): (player, shot context) × draw → make probability
//!
//! Rows are validated on insert: entries must be finite and non-negative and
//! each distribution must sum to 1 within `LOAD_TOLERANCE`. Accepted rows are
//! rescaled so they sum to 1 to machine precision.

use super::PolicyError;
use crate::models::{Action, StateKey, Target, NUM_ACTIONS};
use std::collections::{HashMap, HashSet};

/// Probabilities of `[Shoot, Pass, Dribble]`
pub type ActionProbs = [f64; NUM_ACTIONS];

/// Accepted deviation from 1 for rows read from a fitted model
pub const LOAD_TOLERANCE: f64 = 1e-6;

/// Validate a probability row and rescale it to sum to exactly 1
pub(crate) fn normalize_row(key: StateKey, row: &mut [f64]) -> Result<(), PolicyError> {
    if row.is_empty() {
        return Err(PolicyError::InvalidDistribution {
            key,
            detail: "empty probability vector".to_string(),
        });
    }
    if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(PolicyError::InvalidDistribution {
            key,
            detail: format!("entry {} is negative or non-finite", bad),
        });
    }
    let total: f64 = row.iter().sum();
    if (total - 1.0).abs() > LOAD_TOLERANCE {
        return Err(PolicyError::InvalidDistribution {
            key,
            detail: format!("probabilities sum to {}", total),
        });
    }
    row.iter_mut().for_each(|p| *p /= total);
    Ok(())
}

fn check_draw(draw: usize, num_draws: usize) -> Result<(), PolicyError> {
    if draw >= num_draws {
        return Err(PolicyError::DrawOutOfRange { draw, num_draws });
    }
    Ok(())
}

/// Shot policy (theta)
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    num_draws: usize,
    num_buckets: usize,
    /// Rows laid out `draw * num_buckets + bucket`
    rows: HashMap<StateKey, Vec<ActionProbs>>,
}

impl PolicyTable {
    pub fn new(num_draws: usize, num_buckets: usize) -> Self {
        Self {
            num_draws,
            num_buckets,
            rows: HashMap::new(),
        }
    }

    /// Add the rows of one key, shaped `[draw][bucket]`
    pub fn insert(&mut self, key: StateKey, probs: Vec<Vec<ActionProbs>>) -> Result<(), PolicyError> {
        if self.rows.contains_key(&key) {
            return Err(PolicyError::DuplicateKey(key));
        }
        if probs.len() != self.num_draws || probs.iter().any(|d| d.len() != self.num_buckets) {
            return Err(PolicyError::ShapeMismatch {
                key,
                detail: format!(
                    "policy rows must be {} draws x {} buckets",
                    self.num_draws, self.num_buckets
                ),
            });
        }
        let mut flat: Vec<ActionProbs> = probs.into_iter().flatten().collect();
        for row in flat.iter_mut() {
            normalize_row(key, row)?;
        }
        self.rows.insert(key, flat);
        Ok(())
    }

    /// Action probabilities of `key` in `bucket` under `draw`
    pub fn get(&self, key: &StateKey, bucket: usize, draw: usize) -> Result<&ActionProbs, PolicyError> {
        check_draw(draw, self.num_draws)?;
        self.check_bucket(bucket)?;
        let rows = self.rows.get(key).ok_or(PolicyError::UnknownKey(*key))?;
        Ok(&rows[draw * self.num_buckets + bucket])
    }

    pub(crate) fn get_mut(&mut self, key: &StateKey, bucket: usize, draw: usize) -> Option<&mut ActionProbs> {
        let num_buckets = self.num_buckets;
        self.rows
            .get_mut(key)
            .and_then(|rows| rows.get_mut(draw * num_buckets + bucket))
    }

    pub(crate) fn check_bucket(&self, bucket: usize) -> Result<(), PolicyError> {
        if bucket >= self.num_buckets {
            return Err(PolicyError::BucketOutOfRange {
                bucket,
                num_buckets: self.num_buckets,
            });
        }
        Ok(())
    }

    pub fn contains_key(&self, key: &StateKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Whether `action` has positive probability in any draw or bucket of `key`
    pub fn has_mass(&self, key: &StateKey, action: Action) -> bool {
        self.rows
            .get(key)
            .map_or(false, |rows| rows.iter().any(|row| row[action.index()] > 0.0))
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<StateKey> {
        self.keys_matching(|_| true)
    }

    /// Sorted keys satisfying `pred`; handy for building perturbation targets
    ///
    /// ```
    /// use possession_sim_core::policy::PolicyTable;
    /// use possession_sim_core::models::{Context, PlayerId, StateKey};
    ///
    /// let mut table = PolicyTable::new(1, 1);
    /// let three = StateKey::new(PlayerId(1), "three_open".parse().unwrap());
    /// let drive = StateKey::new(PlayerId(1), Context::Dribble);
    /// table.insert(three, vec![vec![[0.5, 0.5, 0.0]]]).unwrap();
    /// table.insert(drive, vec![vec![[0.0, 0.3, 0.7]]]).unwrap();
    ///
    /// let threes = table.keys_matching(|k| k.context.shot_kind().map_or(false, |s| s.points() == 3));
    /// assert_eq!(threes, vec![three]);
    /// ```
    pub fn keys_matching(&self, pred: impl Fn(&StateKey) -> bool) -> Vec<StateKey> {
        let mut keys: Vec<StateKey> = self.rows.keys().filter(|k| pred(k)).copied().collect();
        keys.sort();
        keys
    }

    pub fn num_draws(&self) -> usize {
        self.num_draws
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Next-target distribution of one (state, action) pair
#[derive(Debug, Clone, PartialEq)]
struct TransitionRow {
    targets: Vec<Target>,
    /// `[draw][target]`
    probs: Vec<Vec<f64>>,
}

/// Borrowed view of one transition distribution
#[derive(Debug, Clone, Copy)]
pub struct TransitionView<'a> {
    pub targets: &'a [Target],
    pub probs: &'a [f64],
}

/// State transitions (mu)
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    num_draws: usize,
    rows: HashMap<(StateKey, Action), TransitionRow>,
}

impl TransitionTable {
    pub fn new(num_draws: usize) -> Self {
        Self {
            num_draws,
            rows: HashMap::new(),
        }
    }

    /// Add the distribution of `(key, action)`, probabilities shaped `[draw][target]`
    pub fn insert(
        &mut self,
        key: StateKey,
        action: Action,
        targets: Vec<Target>,
        probs: Vec<Vec<f64>>,
    ) -> Result<(), PolicyError> {
        if action == Action::Shoot {
            return Err(PolicyError::ShapeMismatch {
                key,
                detail: "shots are terminal and have no transition row".to_string(),
            });
        }
        if self.rows.contains_key(&(key, action)) {
            return Err(PolicyError::DuplicateKey(key));
        }
        let distinct: HashSet<&Target> = targets.iter().collect();
        if distinct.len() != targets.len() {
            return Err(PolicyError::ShapeMismatch {
                key,
                detail: format!("duplicate next-state targets for {}", action),
            });
        }
        if probs.len() != self.num_draws || probs.iter().any(|d| d.len() != targets.len()) {
            return Err(PolicyError::ShapeMismatch {
                key,
                detail: format!(
                    "{} transition must be {} draws x {} targets",
                    action,
                    self.num_draws,
                    targets.len()
                ),
            });
        }
        let mut probs = probs;
        for row in probs.iter_mut() {
            normalize_row(key, row)?;
        }
        self.rows.insert((key, action), TransitionRow { targets, probs });
        Ok(())
    }

    pub fn contains(&self, key: &StateKey, action: Action) -> bool {
        self.rows.contains_key(&(*key, action))
    }

    /// Sorted, deduplicated `(source, next state)` pairs over every row
    pub fn state_links(&self) -> Vec<(StateKey, StateKey)> {
        let mut links: Vec<(StateKey, StateKey)> = self
            .rows
            .iter()
            .flat_map(|((source, _), row)| {
                row.targets.iter().filter_map(move |target| match target {
                    Target::State(next) => Some((*source, *next)),
                    Target::Turnover => None,
                })
            })
            .collect();
        links.sort();
        links.dedup();
        links
    }

    pub fn get(&self, key: &StateKey, action: Action, draw: usize) -> Result<TransitionView<'_>, PolicyError> {
        check_draw(draw, self.num_draws)?;
        let row = self
            .rows
            .get(&(*key, action))
            .ok_or(PolicyError::UnknownTransition { key: *key, action })?;
        Ok(TransitionView {
            targets: &row.targets,
            probs: &row.probs[draw],
        })
    }

    pub fn num_draws(&self) -> usize {
        self.num_draws
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Shot make probabilities (xi)
#[derive(Debug, Clone, PartialEq)]
pub struct RewardTable {
    num_draws: usize,
    rows: HashMap<StateKey, Vec<f64>>,
}

impl RewardTable {
    pub fn new(num_draws: usize) -> Self {
        Self {
            num_draws,
            rows: HashMap::new(),
        }
    }

    /// Add per-draw make probabilities of a shot state
    pub fn insert(&mut self, key: StateKey, make_prob: Vec<f64>) -> Result<(), PolicyError> {
        if key.context.shot_kind().is_none() {
            return Err(PolicyError::ShapeMismatch {
                key,
                detail: "make probabilities require a shot context".to_string(),
            });
        }
        if self.rows.contains_key(&key) {
            return Err(PolicyError::DuplicateKey(key));
        }
        if make_prob.len() != self.num_draws {
            return Err(PolicyError::ShapeMismatch {
                key,
                detail: format!("expected {} make probabilities", self.num_draws),
            });
        }
        if let Some(bad) = make_prob.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(PolicyError::InvalidDistribution {
                key,
                detail: format!("make probability {} outside [0, 1]", bad),
            });
        }
        self.rows.insert(key, make_prob);
        Ok(())
    }

    pub fn contains_key(&self, key: &StateKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn get(&self, key: &StateKey, draw: usize) -> Result<f64, PolicyError> {
        check_draw(draw, self.num_draws)?;
        self.rows
            .get(key)
            .map(|probs| probs[draw])
            .ok_or(PolicyError::UnknownKey(*key))
    }

    pub fn num_draws(&self) -> usize {
        self.num_draws
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
