//! Deterministic random number generation
//!
//! Uses xorshift64* streams seeded per rollout.
//! CRITICAL: All randomness in the simulator MUST go through this module.

mod xorshift;

pub use xorshift::RngStream;
