//! Possession state encoding
//!
//! A state is the pair (player with the ball, context). Contexts are either a
//! shot location with defender proximity (`three_open`, `long2_contested`, ...)
//! or a non-shooting on-ball situation (`dribble`, `pass_received`, ...).
//!
//! Contexts round-trip through their snake_case labels so tables loaded from
//! JSON read naturally:
//!
//! ```
//! use possession_sim_core::models::{Context, Defense, ShotKind, ShotZone};
//!
//! let ctx: Context = "three_open".parse().unwrap();
//! assert_eq!(ctx, Context::Shot(ShotKind::new(ShotZone::Three, Defense::Open)));
//! assert_eq!(ctx.to_string(), "three_open");
//! assert_eq!(ctx.shot_kind().map(|k| k.points()), Some(3));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable numeric entity code of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team code as it appears in the event log
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown state context label: '{0}'")]
pub struct ParseContextError(pub String);

/// Court region of a shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShotZone {
    Paint,
    Mid,
    Long2,
    Three,
}

impl ShotZone {
    fn label(self) -> &'static str {
        match self {
            ShotZone::Paint => "paint",
            ShotZone::Mid => "mid",
            ShotZone::Long2 => "long2",
            ShotZone::Three => "three",
        }
    }
}

/// Nearest-defender proximity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Defense {
    Open,
    Contested,
}

impl Defense {
    fn label(self) -> &'static str {
        match self {
            Defense::Open => "open",
            Defense::Contested => "contested",
        }
    }
}

/// Shot type: zone plus defender proximity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShotKind {
    pub zone: ShotZone,
    pub defense: Defense,
}

impl ShotKind {
    pub const fn new(zone: ShotZone, defense: Defense) -> Self {
        Self { zone, defense }
    }

    /// Points awarded for a make
    pub fn points(&self) -> u32 {
        match self.zone {
            ShotZone::Three => 3,
            ShotZone::Paint | ShotZone::Mid | ShotZone::Long2 => 2,
        }
    }
}

impl fmt::Display for ShotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.zone.label(), self.defense.label())
    }
}

impl FromStr for ShotKind {
    type Err = ParseContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Context>()? {
            Context::Shot(kind) => Ok(kind),
            _ => Err(ParseContextError(s.to_string())),
        }
    }
}

impl TryFrom<String> for ShotKind {
    type Error = ParseContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShotKind> for String {
    fn from(kind: ShotKind) -> Self {
        kind.to_string()
    }
}

/// Situation of the player holding the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Context {
    /// Player is at a shooting location; shooting is a valid action
    Shot(ShotKind),
    Dribble,
    PassReceived,
    GainPossession,
    OffensiveRebound,
}

impl Context {
    /// Shot type implied by the context, if any
    pub fn shot_kind(&self) -> Option<ShotKind> {
        match self {
            Context::Shot(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Whether `action` may be taken from this context
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Shoot => self.shot_kind().is_some(),
            Action::Pass | Action::Dribble => true,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Shot(kind) => write!(f, "{}", kind),
            Context::Dribble => f.write_str("dribble"),
            Context::PassReceived => f.write_str("pass_received"),
            Context::GainPossession => f.write_str("gain_possession"),
            Context::OffensiveRebound => f.write_str("offensive_rebound"),
        }
    }
}

impl FromStr for Context {
    type Err = ParseContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase().replace('-', "_");
        let ctx = match label.as_str() {
            "dribble" => Context::Dribble,
            "pass_received" => Context::PassReceived,
            "gain_possession" => Context::GainPossession,
            "offensive_rebound" => Context::OffensiveRebound,
            other => {
                let (zone, defense) = other
                    .rsplit_once('_')
                    .ok_or_else(|| ParseContextError(s.to_string()))?;
                let zone = match zone {
                    "paint" => ShotZone::Paint,
                    "mid" => ShotZone::Mid,
                    "long2" => ShotZone::Long2,
                    "three" => ShotZone::Three,
                    _ => return Err(ParseContextError(s.to_string())),
                };
                let defense = match defense {
                    "open" => Defense::Open,
                    "contested" => Defense::Contested,
                    _ => return Err(ParseContextError(s.to_string())),
                };
                Context::Shot(ShotKind::new(zone, defense))
            }
        };
        Ok(ctx)
    }
}

impl TryFrom<String> for Context {
    type Error = ParseContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Context> for String {
    fn from(ctx: Context) -> Self {
        ctx.to_string()
    }
}

/// Composite `player × context` key used by every lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    pub player: PlayerId,
    pub context: Context,
}

impl StateKey {
    pub fn new(player: PlayerId, context: Context) -> Self {
        Self { player, context }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.player, self.context)
    }
}

/// On-ball action category chosen by the shot policy
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Shoot,
    Pass,
    Dribble,
}

/// Number of action categories in a policy row
pub const NUM_ACTIONS: usize = 3;

impl Action {
    /// All actions in policy-row order
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Shoot, Action::Pass, Action::Dribble];

    /// Position of the action inside a policy row
    pub fn index(self) -> usize {
        match self {
            Action::Shoot => 0,
            Action::Pass => 1,
            Action::Dribble => 2,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Shoot => "shoot",
            Action::Pass => "pass",
            Action::Dribble => "dribble",
        };
        f.write_str(label)
    }
}

/// Where a pass or dribble leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    State(StateKey),
    /// Possession lost; ends the play with no points
    Turnover,
}
