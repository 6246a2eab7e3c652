//! Rollout output: the moments of one simulated play and how it ended

use super::state::{Action, ShotKind, StateKey};
use serde::{Deserialize, Serialize};

/// One decision point of a simulated play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub state: StateKey,
    /// Shot clock after the lapse leading into this moment
    pub shot_clock: f64,
    /// Posterior draw the decision read from
    pub draw: usize,
    /// Action taken; `None` for a forced clock-violation shot
    pub action: Option<Action>,
}

/// How a simulated play ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Made { shot: ShotKind },
    Missed { shot: ShotKind },
    Turnover,
    /// Shot forced by clock expiry; the policy was not consulted
    ClockViolationShot { shot: ShotKind, made: bool },
}

impl Outcome {
    /// Points scored by the outcome
    pub fn points(&self) -> u32 {
        match self {
            Outcome::Made { shot } => shot.points(),
            Outcome::ClockViolationShot { shot, made: true } => shot.points(),
            Outcome::Missed { .. } | Outcome::Turnover | Outcome::ClockViolationShot { .. } => 0,
        }
    }
}

/// Full record of one rollout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Starting state and clock
    pub start: StateKey,
    pub start_clock: f64,
    pub moments: Vec<Moment>,
    pub outcome: Outcome,
    /// Terminal reward (0, 2 or 3)
    pub reward: u32,
}

impl Trajectory {
    /// Number of lapse-and-decide steps taken
    pub fn steps(&self) -> usize {
        self.moments.len()
    }

    pub fn final_clock(&self) -> f64 {
        self.moments.last().map_or(self.start_clock, |m| m.shot_clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::{Defense, ShotZone};

    #[test]
    fn test_outcome_points() {
        let three = ShotKind::new(ShotZone::Three, Defense::Open);
        let mid = ShotKind::new(ShotZone::Mid, Defense::Contested);
        assert_eq!(Outcome::Made { shot: three }.points(), 3);
        assert_eq!(Outcome::Made { shot: mid }.points(), 2);
        assert_eq!(Outcome::Missed { shot: three }.points(), 0);
        assert_eq!(Outcome::Turnover.points(), 0);
        assert_eq!(Outcome::ClockViolationShot { shot: mid, made: true }.points(), 2);
        assert_eq!(Outcome::ClockViolationShot { shot: three, made: false }.points(), 0);
    }
}
