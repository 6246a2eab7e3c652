//! Domain models for the possession simulator

pub mod event;
pub mod state;
pub mod trajectory;

// Re-exports
pub use event::{EventRecord, EventType, UnknownEventCode};
pub use state::{
    Action, Context, Defense, ParseContextError, PlayerId, ShotKind, ShotZone, StateKey, Target,
    TeamId, NUM_ACTIONS,
};
pub use trajectory::{Moment, Outcome, Trajectory};
