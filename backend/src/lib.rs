//! Possession Simulator Core - Rust Engine
//!
//! Simulates basketball possessions as trajectories of a Markov decision
//! process whose shot-policy, transition and make-probability parameters are
//! posterior draws from an externally fitted Bayesian model.
//!
//! # Architecture
//!
//! - **core**: Shot-clock phase buckets
//! - **models**: Domain types (state keys, events, trajectories)
//! - **lapse**: Empirical time-lapse distribution per clock phase
//! - **extract**: Per-team play starting conditions
//! - **policy**: Posterior-draw tables and policy perturbation
//! - **rollout**: Single-play rollout engine
//! - **orchestrator**: Repeated simulation and reports
//! - **rng**: Deterministic random streams
//!
//! # Critical Invariants
//!
//! 1. Parameter tables are read-only after load and shared by reference
//! 2. All randomness is deterministic (seeded per rollout)
//! 3. One rollout never mixes posterior draws within a step

// Module declarations
pub mod core;
pub mod extract;
pub mod lapse;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod rollout;

// Re-exports for convenience
pub use crate::core::{ClockPhases, PhaseError, CLOCK_EPSILON};
pub use extract::{extract_initial_states, observed_points, InitialCondition};
pub use lapse::{LapseError, TimeLapseModel};
pub use models::{
    Action, Context, EventRecord, EventType, Outcome, PlayerId, ShotKind, StateKey, Target,
    TeamId, Trajectory,
};
pub use orchestrator::{
    SimulationConfig, SimulationDriver, SimulationError, SimulationReport, SimulationRun,
    SimulationSummary,
};
pub use policy::{perturb, PerturbationRule, PolicyError, PolicyStore, PosteriorDraws};
pub use rng::RngStream;
pub use rollout::{DrawSelection, EngineConfig, PlayRolloutEngine, RolloutError};
