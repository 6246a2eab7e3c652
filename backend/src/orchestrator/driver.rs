//! Simulation Driver - repeated rollouts over a team's plays
//!
//! For each outer iteration every play is rolled out once, independently,
//! and the terminal rewards are summed into one simulated score:
//!
//! ```text
//! For iteration i in 0..num_iterations:
//!     total_i = Σ_play rollout(play.state, play.shot_clock, rng(seed, i, play)).reward
//! ```
//!
//! Iterations share nothing mutable. Each rollout's random stream is derived
//! from `(seed, iteration, play)`, so parallel and sequential runs produce
//! identical totals, and a baseline and a perturbed store evaluated with the
//! same seed see the same random streams.
//!
//! # Failures
//!
//! With `FailurePolicy::Abort` (default) the first failed rollout aborts the
//! run: a broken table usually breaks every rollout the same way. `Skip`
//! scores the failed rollout as zero, logs it, and counts it.

use crate::core::{ClockPhases, PhaseError};
use crate::extract::InitialCondition;
use crate::lapse::{LapseError, TimeLapseModel};
use crate::models::{Defense, EventRecord, ShotKind, ShotZone};
use crate::policy::{PolicyError, PolicyStore};
use crate::rng::RngStream;
use crate::rollout::{DrawSelection, EngineConfig, PlayRolloutEngine, RolloutError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Configuration Types
// ============================================================================

/// How clock buckets are laid out over the shot clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketScheme {
    /// Equal-width intervals
    #[default]
    Uniform,
    /// Boundaries at empirical quantiles of the observed shot-clock values
    Quantile,
}

/// What to do when a single rollout fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    Skip,
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base seed for every rollout stream
    pub seed: u64,

    /// Outer repetitions (simulated games)
    pub num_iterations: usize,

    /// Number of shot-clock phases; must match the fitted tables
    pub num_buckets: usize,

    /// League shot-clock length in seconds
    pub shot_clock_duration: f64,

    pub bucket_scheme: BucketScheme,

    pub draw_selection: DrawSelection,

    pub failure_policy: FailurePolicy,

    /// Shot type forced at clock expiry from a non-shooting context
    pub forced_shot: ShotKind,

    /// Run iterations on the rayon pool
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_iterations: 1000,
            num_buckets: 3,
            shot_clock_duration: crate::core::phases::DEFAULT_SHOT_CLOCK,
            bucket_scheme: BucketScheme::Uniform,
            draw_selection: DrawSelection::PerTrajectory,
            failure_policy: FailurePolicy::Abort,
            forced_shot: ShotKind::new(ShotZone::Three, Defense::Contested),
            parallel: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.num_iterations == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_iterations must be positive".to_string(),
            ));
        }
        if self.num_buckets == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_buckets must be positive".to_string(),
            ));
        }
        if !self.shot_clock_duration.is_finite() || self.shot_clock_duration <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "shot_clock_duration must be positive, got {}",
                self.shot_clock_duration
            )));
        }
        Ok(())
    }

    /// Clock phases for this configuration; `history` feeds the quantile scheme
    pub fn clock_phases(&self, history: &[EventRecord]) -> Result<ClockPhases, PhaseError> {
        match self.bucket_scheme {
            BucketScheme::Uniform => ClockPhases::uniform(self.shot_clock_duration, self.num_buckets),
            BucketScheme::Quantile => {
                let clocks: Vec<f64> = history.iter().map(|r| r.shot_clock).collect();
                ClockPhases::quantile(&clocks, self.num_buckets, self.shot_clock_duration)
            }
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            forced_shot: self.forced_shot,
        }
    }
}

/// Simulation error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Rollout of play {play} failed in iteration {iteration}: {source}")]
    Rollout {
        iteration: usize,
        play: u32,
        #[source]
        source: RolloutError,
    },

    #[error("Engine setup failed: {0}")]
    Engine(#[from] RolloutError),

    #[error("Parameter tables: {0}")]
    Policy(#[from] PolicyError),

    #[error("Time-lapse model: {0}")]
    Lapse(#[from] LapseError),

    #[error("Clock phases: {0}")]
    Phase(#[from] PhaseError),
}

/// Totals of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    /// One simulated total per iteration, in iteration order
    pub totals: Vec<f64>,
    /// Rollouts scored as zero under `FailurePolicy::Skip`
    pub failed_rollouts: usize,
}

// ============================================================================
// Driver
// ============================================================================

/// Repeats rollouts over a list of plays
#[derive(Debug, Clone)]
pub struct SimulationDriver {
    config: SimulationConfig,
}

impl SimulationDriver {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// One simulated total per iteration
    ///
    /// # Example
    ///
    /// ```
    /// use possession_sim_core::extract::InitialCondition;
    /// use possession_sim_core::models::{PlayerId, StateKey};
    /// use possession_sim_core::orchestrator::{SimulationConfig, SimulationDriver};
    /// use possession_sim_core::policy::{PolicyStore, PolicyTable, RewardTable, TransitionTable};
    /// use possession_sim_core::{ClockPhases, TimeLapseModel};
    ///
    /// // A sure-make long two on every play
    /// let shooter = StateKey::new(PlayerId(9), "long2_open".parse().unwrap());
    /// let mut policy = PolicyTable::new(1, 1);
    /// policy.insert(shooter, vec![vec![[1.0, 0.0, 0.0]]]).unwrap();
    /// let mut reward = RewardTable::new(1);
    /// reward.insert(shooter, vec![1.0]).unwrap();
    /// let store = PolicyStore::new(policy, TransitionTable::new(1), reward).unwrap();
    /// let lapses = TimeLapseModel::from_buckets(ClockPhases::uniform(24.0, 1).unwrap(), vec![vec![3.0]]).unwrap();
    ///
    /// let plays = vec![
    ///     InitialCondition { play: 1, state: shooter, shot_clock: 24.0 },
    ///     InitialCondition { play: 2, state: shooter, shot_clock: 18.0 },
    /// ];
    /// let config = SimulationConfig { num_buckets: 1, ..Default::default() };
    /// let driver = SimulationDriver::new(config).unwrap();
    /// let totals = driver.run(&plays, &store, &lapses, 5).unwrap();
    /// assert_eq!(totals, vec![4.0; 5]);
    /// ```
    pub fn run(
        &self,
        initial_states: &[InitialCondition],
        store: &PolicyStore,
        lapses: &TimeLapseModel,
        num_iterations: usize,
    ) -> Result<Vec<f64>, SimulationError> {
        Ok(self
            .run_detailed(initial_states, store, lapses, num_iterations)?
            .totals)
    }

    /// Like `run`, also reporting skipped rollouts
    pub fn run_detailed(
        &self,
        initial_states: &[InitialCondition],
        store: &PolicyStore,
        lapses: &TimeLapseModel,
        num_iterations: usize,
    ) -> Result<SimulationRun, SimulationError> {
        if num_iterations == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_iterations must be positive".to_string(),
            ));
        }
        if let DrawSelection::Fixed(draw) = self.config.draw_selection {
            if draw >= store.num_draws() {
                return Err(PolicyError::DrawOutOfRange {
                    draw,
                    num_draws: store.num_draws(),
                }
                .into());
            }
        }
        let engine = PlayRolloutEngine::new(store, lapses, self.config.engine_config())?;

        let iterate = |iteration: usize| self.run_iteration(&engine, initial_states, iteration);
        let per_iteration: Vec<(f64, usize)> = if self.config.parallel {
            (0..num_iterations)
                .into_par_iter()
                .map(iterate)
                .collect::<Result<_, _>>()?
        } else {
            (0..num_iterations)
                .map(iterate)
                .collect::<Result<_, _>>()?
        };

        let (totals, failures): (Vec<f64>, Vec<usize>) = per_iteration.into_iter().unzip();
        let failed_rollouts = failures.into_iter().sum();
        info!(
            plays = initial_states.len(),
            iterations = num_iterations,
            failed_rollouts,
            "simulation run complete"
        );
        Ok(SimulationRun {
            totals,
            failed_rollouts,
        })
    }

    fn run_iteration(
        &self,
        engine: &PlayRolloutEngine<'_>,
        initial_states: &[InitialCondition],
        iteration: usize,
    ) -> Result<(f64, usize), SimulationError> {
        let mut total: u64 = 0;
        let mut failed = 0usize;

        for (index, start) in initial_states.iter().enumerate() {
            let mut rng = RngStream::for_rollout(self.config.seed, iteration, index);
            match engine.rollout(start.state, start.shot_clock, self.config.draw_selection, &mut rng) {
                Ok(trajectory) => total += u64::from(trajectory.reward),
                Err(source) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(SimulationError::Rollout {
                            iteration,
                            play: start.play,
                            source,
                        })
                    }
                    FailurePolicy::Skip => {
                        warn!(iteration, play = start.play, error = %source, "skipping failed rollout");
                        failed += 1;
                    }
                },
            }
        }
        Ok((total as f64, failed))
    }
}
