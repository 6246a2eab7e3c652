//! Play rollout engine
//!
//! See `engine.rs` for the step loop.

pub mod engine;

pub use engine::{DrawSelection, EngineConfig, PlayRolloutEngine, RolloutError};
