//! Tracking-log event records
//!
//! One row per on-ball event. Plays are already filtered upstream (fouls and
//! related stoppages removed); the simulator only projects what it needs from
//! these rows: the first event of each play and the (shot clock, lapse)
//! pairs.

use super::state::{Context, PlayerId, StateKey, TeamId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown event-type code: {0}")]
pub struct UnknownEventCode(pub u8);

/// On-ball event vocabulary, stored as tracking-feed event codes
///
/// ```
/// use possession_sim_core::models::EventType;
///
/// assert_eq!(EventType::try_from(22).unwrap(), EventType::Pass);
/// assert_eq!(u8::from(EventType::MadeShot), 3);
/// assert!(EventType::try_from(99).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventType {
    MadeShot,
    MissedShot,
    OffensiveRebound,
    Turnover,
    Dribble,
    Pass,
    GainPossession,
    Assist,
}

impl EventType {
    /// Events that end a play
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventType::MadeShot | EventType::MissedShot | EventType::Turnover
        )
    }
}

impl TryFrom<u8> for EventType {
    type Error = UnknownEventCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            3 => EventType::MadeShot,
            4 => EventType::MissedShot,
            5 => EventType::OffensiveRebound,
            7 => EventType::Turnover,
            21 => EventType::Dribble,
            22 => EventType::Pass,
            23 => EventType::GainPossession,
            25 => EventType::Assist,
            other => return Err(UnknownEventCode(other)),
        })
    }
}

impl From<EventType> for u8 {
    fn from(event: EventType) -> Self {
        match event {
            EventType::MadeShot => 3,
            EventType::MissedShot => 4,
            EventType::OffensiveRebound => 5,
            EventType::Turnover => 7,
            EventType::Dribble => 21,
            EventType::Pass => 22,
            EventType::GainPossession => 23,
            EventType::Assist => 25,
        }
    }
}

/// One row of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Play (possession) index
    pub play: u32,
    /// Player performing the event
    pub entity: PlayerId,
    pub event: EventType,
    /// State context of the ball handler at this event
    pub context: Context,
    /// Seconds remaining in the period
    pub game_clock: f64,
    /// Seconds remaining on the shot clock
    pub shot_clock: f64,
    pub team: TeamId,
    /// Points scored by this event (non-zero only on made shots)
    #[serde(default)]
    pub points: u32,
    /// Seconds until the next event of the same play; absent on the last event
    #[serde(default)]
    pub lapse: Option<f64>,
}

impl EventRecord {
    /// State of the ball handler at this event
    pub fn state(&self) -> StateKey {
        StateKey::new(self.entity, self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes_round_trip() {
        for code in [3u8, 4, 5, 7, 21, 22, 23, 25] {
            let event = EventType::try_from(code).unwrap();
            assert_eq!(u8::from(event), code);
        }
    }

    #[test]
    fn test_terminal_events() {
        assert!(EventType::MadeShot.is_terminal());
        assert!(EventType::Turnover.is_terminal());
        assert!(!EventType::Pass.is_terminal());
        assert!(!EventType::OffensiveRebound.is_terminal());
    }

    #[test]
    fn test_record_deserializes_with_missing_lapse() {
        let json = r#"{
            "play": 4, "entity": 2544, "event": 21, "context": "dribble",
            "game_clock": 611.2, "shot_clock": 19.5, "team": "CLE"
        }"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.event, EventType::Dribble);
        assert_eq!(record.lapse, None);
        assert_eq!(record.points, 0);
        assert_eq!(record.state(), StateKey::new(PlayerId(2544), Context::Dribble));
    }
}
