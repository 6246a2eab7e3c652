//! Per-team play starting conditions
//!
//! Projects each play of a team onto its first recorded on-ball event. The
//! input is assumed to be filtered already; nothing is dropped here except
//! plays belonging to other teams.

use crate::models::{EventRecord, EventType, StateKey, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Starting condition of one play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialCondition {
    pub play: u32,
    pub state: StateKey,
    pub shot_clock: f64,
}

/// Starting (state, shot clock) of every play of `team`, in play-index order.
///
/// A play belongs to the team of its first recorded event. "First" means
/// first in input order among the rows of that play.
///
/// # Example
///
/// ```
/// use possession_sim_core::extract::extract_initial_states;
/// use possession_sim_core::models::{Context, EventRecord, EventType, PlayerId, TeamId};
///
/// let row = |play, entity, event, shot_clock| EventRecord {
///     play,
///     entity: PlayerId(entity),
///     event,
///     context: Context::Dribble,
///     game_clock: 700.0,
///     shot_clock,
///     team: TeamId::new("GSW"),
///     points: 0,
///     lapse: None,
/// };
/// let history = vec![
///     row(2, 7, EventType::GainPossession, 23.0),
///     row(1, 5, EventType::Dribble, 24.0),
///     row(2, 8, EventType::Pass, 20.0),
/// ];
///
/// let starts = extract_initial_states(&history, &TeamId::new("GSW"));
/// assert_eq!(starts.len(), 2);
/// assert_eq!(starts[0].play, 1);
/// assert_eq!(starts[1].state.player, PlayerId(7));
/// ```
pub fn extract_initial_states(history: &[EventRecord], team: &TeamId) -> Vec<InitialCondition> {
    first_events(history)
        .into_values()
        .filter(|record| &record.team == team)
        .map(|record| InitialCondition {
            play: record.play,
            state: record.state(),
            shot_clock: record.shot_clock,
        })
        .collect()
}

/// Teams appearing as the owner of at least one play, sorted
pub fn teams(history: &[EventRecord]) -> Vec<TeamId> {
    let mut teams: Vec<TeamId> = first_events(history)
        .into_values()
        .map(|record| record.team.clone())
        .collect();
    teams.sort();
    teams.dedup();
    teams
}

/// Points the team actually scored over its plays (made shots only)
pub fn observed_points(history: &[EventRecord], team: &TeamId) -> u32 {
    let owned: Vec<u32> = first_events(history)
        .into_values()
        .filter(|record| &record.team == team)
        .map(|record| record.play)
        .collect();

    history
        .iter()
        .filter(|r| r.event == EventType::MadeShot && owned.binary_search(&r.play).is_ok())
        .map(|r| r.points)
        .sum()
}

fn first_events(history: &[EventRecord]) -> BTreeMap<u32, &EventRecord> {
    let mut first = BTreeMap::new();
    for record in history {
        first.entry(record.play).or_insert(record);
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Context, PlayerId};

    fn row(play: u32, team: &str, event: EventType, points: u32) -> EventRecord {
        EventRecord {
            play,
            entity: PlayerId(play * 10),
            event,
            context: Context::Dribble,
            game_clock: 600.0,
            shot_clock: 24.0,
            team: TeamId::new(team),
            points,
            lapse: None,
        }
    }

    #[test]
    fn test_empty_history() {
        assert!(extract_initial_states(&[], &TeamId::new("BOS")).is_empty());
        assert!(teams(&[]).is_empty());
    }

    #[test]
    fn test_observed_points_only_counts_team_makes() {
        let history = vec![
            row(1, "BOS", EventType::Dribble, 0),
            row(1, "BOS", EventType::MadeShot, 3),
            row(2, "NYK", EventType::Pass, 0),
            row(2, "NYK", EventType::MadeShot, 2),
            row(3, "BOS", EventType::Dribble, 0),
            row(3, "BOS", EventType::MissedShot, 0),
        ];
        assert_eq!(observed_points(&history, &TeamId::new("BOS")), 3);
        assert_eq!(observed_points(&history, &TeamId::new("NYK")), 2);
        assert_eq!(teams(&history), vec![TeamId::new("BOS"), TeamId::new("NYK")]);
    }
}
