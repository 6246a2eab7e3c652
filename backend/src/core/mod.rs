//! Shot-clock discretisation

pub mod phases;

pub use phases::{ClockPhases, PhaseError, CLOCK_EPSILON};
