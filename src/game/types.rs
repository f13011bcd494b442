use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// One side of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Allies,
    Axis,
}

impl Team {
    /// Both sides, in evaluation order
    pub const ALL: [Team; 2] = [Team::Allies, Team::Axis];

    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Allies => "allies",
            Team::Axis => "axis",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a player, captured once per evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRef {
    /// Display name at capture time
    pub name: String,
    /// Stable player identifier
    pub player_id: String,
}

impl PlayerRef {
    pub fn new(name: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            player_id: player_id.into(),
        }
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.player_id)
    }
}

/// A player as listed in the team view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub player_id: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub role: Option<String>,
    /// Server-specific fields the engine does not interpret
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Player {
    pub fn new(name: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            player_id: player_id.into(),
            ..Default::default()
        }
    }

    pub fn player_ref(&self) -> PlayerRef {
        PlayerRef::new(self.name.clone(), self.player_id.clone())
    }
}

/// A squad roster (or the commander pseudo-squad)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default, rename = "type")]
    pub squad_type: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Squad {
    /// Label used when the commander is evaluated as a squad of one
    pub const COMMANDER_LABEL: &'static str = "Commander";

    pub fn with_players(players: Vec<Player>) -> Self {
        Self {
            players,
            ..Default::default()
        }
    }

    /// Pseudo-squad holding only the commander
    pub fn commander(commander: Player) -> Self {
        Self::with_players(vec![commander])
    }
}

/// One team's composition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    #[serde(default)]
    pub commander: Option<Player>,
    /// Squads keyed by squad name, iterated in name order
    #[serde(default)]
    pub squads: BTreeMap<String, Squad>,
}

/// Full team/squad layout of the live match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamView {
    #[serde(default)]
    pub allies: Option<TeamInfo>,
    #[serde(default)]
    pub axis: Option<TeamInfo>,
}

impl TeamView {
    pub fn team(&self, team: Team) -> Option<&TeamInfo> {
        match team {
            Team::Allies => self.allies.as_ref(),
            Team::Axis => self.axis.as_ref(),
        }
    }

    /// Total number of listed players (commanders included)
    pub fn player_count(&self) -> usize {
        Team::ALL
            .iter()
            .filter_map(|team| self.team(*team))
            .map(|info| {
                info.commander.iter().count()
                    + info.squads.values().map(|s| s.players.len()).sum::<usize>()
            })
            .sum()
    }
}

/// Global state of the running game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub num_allied_players: u32,
    pub num_axis_players: u32,
    pub allied_score: u32,
    pub axis_score: u32,
    pub time_remaining_secs: f64,
    pub current_map: Option<String>,
    pub next_map: Option<String>,
}

/// Extended information about a single player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedPlayer {
    pub name: String,
    pub player_id: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A kill reported by the game log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillEvent {
    pub timestamp: DateTime<Utc>,
    pub killer: PlayerRef,
    pub killer_team: Option<Team>,
    pub victim: PlayerRef,
    pub victim_team: Option<Team>,
    pub weapon: String,
}

impl KillEvent {
    pub fn is_team_kill(&self) -> bool {
        matches!((self.killer_team, self.victim_team), (Some(a), Some(b)) if a == b)
    }
}

/// Discrete events the engine subscribes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Kill(KillEvent),
    Connected {
        timestamp: DateTime<Utc>,
        player: PlayerRef,
    },
}

impl GameEvent {
    /// Player whose actions must stay ordered relative to this event
    pub fn subject(&self) -> &PlayerRef {
        match self {
            GameEvent::Kill(kill) => &kill.killer,
            GameEvent::Connected { player, .. } => player,
        }
    }
}
