//! Rollout Engine - simulate one possession to its terminal outcome
//!
//! # Step loop
//!
//! ```text
//! InProgress(s, c):
//! 1. bucket(c) → sample lapse l from the time-lapse model
//! 2. c' = c - l, snapped to 0 when c' <= CLOCK_EPSILON
//! 3. c' == 0 → forced shot (shot type of s, or the configured fallback),
//!    reward model only → Terminal
//! 4. sample action from policy(s, bucket(c')) restricted to actions valid at s
//! 5. Shoot → make with reward_prob(s) → Terminal(made | missed)
//! 6. Pass/Dribble → sample target from transition(s, action)
//!       Turnover → Terminal(turnover)
//!       State(s'') → InProgress(s'', c')
//! ```
//!
//! Every lapse is strictly positive, so a play starting at clock `c0` ends
//! after at most `ceil(c0 / min_lapse)` steps.
//!
//! # Posterior draws
//!
//! `DrawSelection::PerTrajectory` (default) fixes one draw for the whole
//! play. `PerStep` redraws before each step; a single step still reads the
//! policy, transition and reward families from the same draw.

use crate::core::{PhaseError, CLOCK_EPSILON};
use crate::lapse::TimeLapseModel;
use crate::models::{
    Action, Context, Defense, Moment, Outcome, ShotKind, ShotZone, StateKey, Target, Trajectory,
    NUM_ACTIONS,
};
use crate::policy::{PolicyError, PolicyStore};
use crate::rng::RngStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Errors that abort a single rollout
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RolloutError {
    #[error("Parameter lookup failed: {0}")]
    Policy(#[from] PolicyError),

    #[error("Clock error: {0}")]
    Phase(#[from] PhaseError),

    #[error("Invalid {table} distribution at {state} (clock bucket {bucket}, draw {draw})")]
    InvalidDistribution {
        table: &'static str,
        state: StateKey,
        bucket: usize,
        draw: usize,
    },

    #[error("Invalid starting shot clock: {0}")]
    InvalidStart(f64),

    #[error("Policy tables use {policy} clock buckets but the lapse model uses {lapse}")]
    BucketMismatch { policy: usize, lapse: usize },
}

/// How posterior draws are assigned to the steps of a rollout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawSelection {
    /// One uniformly chosen draw for the whole trajectory
    #[default]
    PerTrajectory,
    /// A fresh uniformly chosen draw before every step
    PerStep,
    /// Always this draw (0-based)
    Fixed(usize),
}

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shot type attempted at clock expiry from a non-shooting context
    pub forced_shot: ShotKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            forced_shot: ShotKind::new(ShotZone::Three, Defense::Contested),
        }
    }
}

/// Stochastic possession simulator over one fitted model
///
/// Borrows the tables read-only; one engine can serve any number of
/// concurrent rollouts as long as each has its own `RngStream`.
#[derive(Debug, Clone, Copy)]
pub struct PlayRolloutEngine<'a> {
    store: &'a PolicyStore,
    lapses: &'a TimeLapseModel,
    config: EngineConfig,
}

impl<'a> PlayRolloutEngine<'a> {
    pub fn new(
        store: &'a PolicyStore,
        lapses: &'a TimeLapseModel,
        config: EngineConfig,
    ) -> Result<Self, RolloutError> {
        if store.num_buckets() != lapses.num_buckets() {
            return Err(RolloutError::BucketMismatch {
                policy: store.num_buckets(),
                lapse: lapses.num_buckets(),
            });
        }
        store.check_forced_shot(config.forced_shot)?;
        Ok(Self {
            store,
            lapses,
            config,
        })
    }

    /// Simulate one play from `(start, shot_clock)` to its terminal outcome.
    ///
    /// Starting clocks above the shot-clock duration are capped at the
    /// duration.
    pub fn rollout(
        &self,
        start: StateKey,
        shot_clock: f64,
        selection: DrawSelection,
        rng: &mut RngStream,
    ) -> Result<Trajectory, RolloutError> {
        if !shot_clock.is_finite() || shot_clock < 0.0 {
            return Err(RolloutError::InvalidStart(shot_clock));
        }
        let phases = self.lapses.phases();
        let start_clock = shot_clock.min(phases.duration());

        let trajectory_draw = self.pick_draw(selection, rng)?;
        let mut state = start;
        let mut clock = start_clock;
        let mut moments = Vec::new();

        let outcome = loop {
            let draw = match selection {
                DrawSelection::PerStep => self.pick_draw(selection, rng)?,
                _ => trajectory_draw,
            };

            let lapse = self.lapses.sample(phases.bucket(clock)?, rng);
            clock -= lapse;

            // Rounding residue from repeated subtraction counts as expiry
            if clock <= CLOCK_EPSILON {
                let shot = state.context.shot_kind().unwrap_or(self.config.forced_shot);
                let shooter = StateKey::new(state.player, Context::Shot(shot));
                let made = rng.bernoulli(self.store.reward_prob(&shooter, draw)?);
                moments.push(Moment {
                    state,
                    shot_clock: 0.0,
                    draw,
                    action: None,
                });
                break Outcome::ClockViolationShot { shot, made };
            }

            let bucket = phases.bucket(clock)?;
            let action = self.choose_action(&state, bucket, draw, rng)?;
            moments.push(Moment {
                state,
                shot_clock: clock,
                draw,
                action: Some(action),
            });
            trace!(%state, clock, %action, draw, "rollout step");

            match action {
                Action::Shoot => {
                    // choose_action only returns Shoot at shot contexts
                    let shot = state.context.shot_kind().ok_or(RolloutError::InvalidDistribution {
                        table: "policy",
                        state,
                        bucket,
                        draw,
                    })?;
                    if rng.bernoulli(self.store.reward_prob(&state, draw)?) {
                        break Outcome::Made { shot };
                    }
                    break Outcome::Missed { shot };
                }
                Action::Pass | Action::Dribble => {
                    let view = self.store.transition(&state, action, draw)?;
                    let idx = rng.choose_weighted(view.probs).ok_or(
                        RolloutError::InvalidDistribution {
                            table: "transition",
                            state,
                            bucket,
                            draw,
                        },
                    )?;
                    match view.targets[idx] {
                        Target::Turnover => break Outcome::Turnover,
                        Target::State(next) => state = next,
                    }
                }
            }
        };

        Ok(Trajectory {
            start,
            start_clock,
            moments,
            reward: outcome.points(),
            outcome,
        })
    }

    /// Sample an action from the policy row, masking actions invalid at `state`
    fn choose_action(
        &self,
        state: &StateKey,
        bucket: usize,
        draw: usize,
        rng: &mut RngStream,
    ) -> Result<Action, RolloutError> {
        let probs = self.store.policy(state, bucket, draw)?;
        let mut weights = [0.0; NUM_ACTIONS];
        for action in Action::ALL {
            if state.context.allows(action) {
                weights[action.index()] = probs[action.index()];
            }
        }
        rng.choose_weighted(&weights)
            .map(|i| Action::ALL[i])
            .ok_or(RolloutError::InvalidDistribution {
                table: "policy",
                state: *state,
                bucket,
                draw,
            })
    }

    fn pick_draw(&self, selection: DrawSelection, rng: &mut RngStream) -> Result<usize, RolloutError> {
        let num_draws = self.store.num_draws();
        match selection {
            DrawSelection::Fixed(draw) if draw >= num_draws => {
                Err(PolicyError::DrawOutOfRange { draw, num_draws }.into())
            }
            DrawSelection::Fixed(draw) => Ok(draw),
            DrawSelection::PerTrajectory | DrawSelection::PerStep => Ok(rng.index(num_draws)),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClockPhases;
    use crate::models::PlayerId;
    use crate::policy::{PolicyTable, RewardTable, TransitionTable};

    fn key(player: u32, ctx: &str) -> StateKey {
        StateKey::new(PlayerId(player), ctx.parse().unwrap())
    }

    fn lapses(value: f64) -> TimeLapseModel {
        TimeLapseModel::from_buckets(ClockPhases::uniform(24.0, 1).unwrap(), vec![vec![value]])
            .unwrap()
    }

    #[test]
    fn test_bucket_mismatch_rejected() {
        let store =
            PolicyStore::new(PolicyTable::new(1, 3), TransitionTable::new(1), RewardTable::new(1))
                .unwrap();
        let lapses = lapses(1.0);
        assert_eq!(
            PlayRolloutEngine::new(&store, &lapses, EngineConfig::default()).unwrap_err(),
            RolloutError::BucketMismatch { policy: 3, lapse: 1 }
        );
    }

    #[test]
    fn test_policy_row_with_only_invalid_mass_fails() {
        // Dribble context cannot shoot; a row with all mass on Shoot is unusable there
        let dribble = key(4, "dribble");
        let mut policy = PolicyTable::new(1, 1);
        policy.insert(dribble, vec![vec![[1.0, 0.0, 0.0]]]).unwrap();
        let mut reward = RewardTable::new(1);
        reward.insert(key(4, "three_contested"), vec![0.3]).unwrap();
        let store = PolicyStore::new(policy, TransitionTable::new(1), reward).unwrap();
        let lapses = lapses(2.0);
        let engine = PlayRolloutEngine::new(&store, &lapses, EngineConfig::default()).unwrap();

        let err = engine
            .rollout(dribble, 24.0, DrawSelection::PerTrajectory, &mut RngStream::new(1))
            .unwrap_err();
        assert_eq!(
            err,
            RolloutError::InvalidDistribution {
                table: "policy",
                state: dribble,
                bucket: 0,
                draw: 0
            }
        );
    }

    #[test]
    fn test_negative_start_rejected() {
        let store =
            PolicyStore::new(PolicyTable::new(1, 1), TransitionTable::new(1), RewardTable::new(1))
                .unwrap();
        let lapses = lapses(1.0);
        let engine = PlayRolloutEngine::new(&store, &lapses, EngineConfig::default()).unwrap();
        assert_eq!(
            engine
                .rollout(key(1, "dribble"), -1.0, DrawSelection::PerTrajectory, &mut RngStream::new(1))
                .unwrap_err(),
            RolloutError::InvalidStart(-1.0)
        );
    }

    #[test]
    fn test_fixed_draw_out_of_range() {
        let store =
            PolicyStore::new(PolicyTable::new(2, 1), TransitionTable::new(2), RewardTable::new(2))
                .unwrap();
        let lapses = lapses(1.0);
        let engine = PlayRolloutEngine::new(&store, &lapses, EngineConfig::default()).unwrap();
        let err = engine
            .rollout(key(1, "dribble"), 10.0, DrawSelection::Fixed(2), &mut RngStream::new(1))
            .unwrap_err();
        assert_eq!(
            err,
            RolloutError::Policy(PolicyError::DrawOutOfRange {
                draw: 2,
                num_draws: 2
            })
        );
    }
}
