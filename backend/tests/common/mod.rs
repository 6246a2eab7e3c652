//! Shared fixtures for integration tests

#![allow(dead_code)]

use possession_sim_core::models::{Action, Context, EventRecord, EventType, PlayerId, StateKey, Target, TeamId};
use possession_sim_core::policy::{
    PolicyEntry, PolicyStore, PolicyTable, PosteriorDraws, RewardEntry, RewardTable, TransitionEntry,
    TransitionTable,
};
use possession_sim_core::{ClockPhases, TimeLapseModel};

pub fn key(player: u32, ctx: &str) -> StateKey {
    StateKey::new(PlayerId(player), ctx.parse().unwrap())
}

/// Lapse model with one bucket over [0, 24] that always returns `value`
pub fn constant_lapses(value: f64) -> TimeLapseModel {
    TimeLapseModel::from_buckets(ClockPhases::uniform(24.0, 1).unwrap(), vec![vec![value]]).unwrap()
}

/// Same lapses in every one of `num_buckets` uniform buckets
pub fn lapses(num_buckets: usize, values: &[f64]) -> TimeLapseModel {
    TimeLapseModel::from_buckets(
        ClockPhases::uniform(24.0, num_buckets).unwrap(),
        vec![values.to_vec(); num_buckets],
    )
    .unwrap()
}

/// Two states, one draw, one bucket: player 1 at `mid_open` always shoots and
/// always makes; player 2 dribbling always passes to player 1.
pub fn sure_two_store() -> PolicyStore {
    let shooter = key(1, "mid_open");
    let handler = key(2, "dribble");

    let mut policy = PolicyTable::new(1, 1);
    policy.insert(shooter, vec![vec![[1.0, 0.0, 0.0]]]).unwrap();
    policy.insert(handler, vec![vec![[0.0, 1.0, 0.0]]]).unwrap();

    let mut transition = TransitionTable::new(1);
    transition
        .insert(handler, Action::Pass, vec![Target::State(shooter)], vec![vec![1.0]])
        .unwrap();

    let mut reward = RewardTable::new(1);
    reward.insert(shooter, vec![1.0]).unwrap();
    reward.insert(key(1, "three_contested"), vec![1.0]).unwrap();
    reward.insert(key(2, "three_contested"), vec![1.0]).unwrap();

    PolicyStore::new(policy, transition, reward).unwrap()
}

/// Single shooter at `context` who always shoots with the given make probability
pub fn lone_shooter_store(context: &str, make_prob: f64) -> PolicyStore {
    let shooter = key(1, context);
    let mut policy = PolicyTable::new(1, 1);
    policy.insert(shooter, vec![vec![[1.0, 0.0, 0.0]]]).unwrap();
    let mut reward = RewardTable::new(1);
    reward.insert(shooter, vec![make_prob]).unwrap();
    PolicyStore::new(policy, TransitionTable::new(1), reward).unwrap()
}

fn normalized(row: [f64; 3]) -> [f64; 3] {
    let total: f64 = row.iter().sum();
    [row[0] / total, row[1] / total, row[2] / total]
}

/// Two-player court with 2 draws and 3 clock buckets.
///
/// Shooting becomes more likely late in the clock (bucket 0) and slightly
/// more likely under draw 1.
pub fn court_draws() -> PosteriorDraws {
    let num_draws = 2;
    let num_buckets = 3;
    let base: Vec<(u32, &str, [f64; 3])> = vec![
        (1, "dribble", [0.0, 0.6, 0.4]),
        (1, "three_open", [0.5, 0.4, 0.1]),
        (1, "paint_contested", [0.7, 0.3, 0.0]),
        (2, "pass_received", [0.0, 0.3, 0.7]),
        (2, "mid_open", [0.6, 0.3, 0.1]),
        (2, "paint_open", [0.9, 0.1, 0.0]),
        (2, "three_contested", [0.4, 0.5, 0.1]),
    ];

    let policy = base
        .iter()
        .map(|(player, ctx, row)| PolicyEntry {
            player: PlayerId(*player),
            context: ctx.parse().unwrap(),
            probs: (0..num_draws)
                .map(|draw| {
                    (0..num_buckets)
                        .map(|bucket| {
                            let late = if bucket == 0 { 1.5 } else { 1.0 };
                            let lean = 1.0 + 0.1 * draw as f64;
                            normalized([row[0] * late * lean, row[1], row[2]])
                        })
                        .collect()
                })
                .collect(),
        })
        .collect();

    let to = |player: u32, ctx: &str| Target::State(key(player, ctx));
    let rows: Vec<(u32, &str, Action, Vec<Target>, Vec<f64>)> = vec![
        (1, "dribble", Action::Pass, vec![to(2, "pass_received"), Target::Turnover], vec![0.9, 0.1]),
        (
            1,
            "dribble",
            Action::Dribble,
            vec![to(1, "three_open"), to(1, "paint_contested"), Target::Turnover],
            vec![0.5, 0.4, 0.1],
        ),
        (1, "three_open", Action::Pass, vec![to(2, "pass_received")], vec![1.0]),
        (
            1,
            "three_open",
            Action::Dribble,
            vec![to(1, "paint_contested"), Target::Turnover],
            vec![0.9, 0.1],
        ),
        (
            1,
            "paint_contested",
            Action::Pass,
            vec![to(2, "pass_received"), Target::Turnover],
            vec![0.9, 0.1],
        ),
        (1, "paint_contested", Action::Dribble, vec![to(1, "dribble")], vec![1.0]),
        (2, "pass_received", Action::Pass, vec![to(1, "dribble"), Target::Turnover], vec![0.95, 0.05]),
        (
            2,
            "pass_received",
            Action::Dribble,
            vec![to(2, "mid_open"), to(2, "three_contested"), Target::Turnover],
            vec![0.6, 0.35, 0.05],
        ),
        (2, "mid_open", Action::Pass, vec![to(1, "dribble"), Target::Turnover], vec![0.9, 0.1]),
        (2, "mid_open", Action::Dribble, vec![to(2, "paint_open"), Target::Turnover], vec![0.8, 0.2]),
        (2, "paint_open", Action::Pass, vec![to(1, "dribble")], vec![1.0]),
        (2, "paint_open", Action::Dribble, vec![to(2, "paint_open")], vec![1.0]),
        (2, "three_contested", Action::Pass, vec![to(1, "dribble"), Target::Turnover], vec![0.95, 0.05]),
        (2, "three_contested", Action::Dribble, vec![to(2, "mid_open"), Target::Turnover], vec![0.9, 0.1]),
    ];
    let transition = rows
        .into_iter()
        .map(|(player, ctx, action, targets, probs)| TransitionEntry {
            player: PlayerId(player),
            context: ctx.parse().unwrap(),
            action,
            targets,
            probs: vec![probs; num_draws],
        })
        .collect();

    let reward = [
        (1, "three_open", [0.38, 0.36]),
        (1, "paint_contested", [0.55, 0.50]),
        (1, "three_contested", [0.25, 0.30]),
        (2, "mid_open", [0.42, 0.44]),
        (2, "paint_open", [0.62, 0.60]),
        (2, "three_contested", [0.30, 0.28]),
    ]
    .into_iter()
    .map(|(player, ctx, probs)| RewardEntry {
        player: PlayerId(player),
        context: ctx.parse().unwrap(),
        make_prob: probs.to_vec(),
    })
    .collect();

    PosteriorDraws {
        num_draws,
        num_buckets,
        policy,
        transition,
        reward,
    }
}

pub fn court_store() -> PolicyStore {
    PolicyStore::from_draws(&court_draws()).unwrap()
}

/// Event-log row builder
pub fn event(
    play: u32,
    entity: u32,
    event: EventType,
    context: &str,
    shot_clock: f64,
    team: &str,
    lapse: Option<f64>,
) -> EventRecord {
    EventRecord {
        play,
        entity: PlayerId(entity),
        event,
        context: context.parse::<Context>().unwrap(),
        game_clock: 600.0,
        shot_clock,
        team: TeamId::new(team),
        points: 0,
        lapse,
    }
}
