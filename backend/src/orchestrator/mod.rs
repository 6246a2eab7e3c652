//! Orchestrator - repeated simulation and reporting
//!
//! - `driver.rs`: iterates rollouts over every play into per-iteration totals
//! - `report.rs`: summaries, observed-score comparison, serialisable report

pub mod driver;
pub mod report;

pub use driver::{
    BucketScheme, FailurePolicy, SimulationConfig, SimulationDriver, SimulationError, SimulationRun,
};
pub use report::{
    compute_config_hash, percentile_rank, SimulationReport, SimulationSummary, TeamResult,
    VariantResult,
};
