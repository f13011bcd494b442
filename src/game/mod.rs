//! Match State Model
//!
//! Snapshot types fetched from the game server and handed to moderators:
//! the per-team squad layout, the global game state, per-player detail
//! and the discrete events (kills, connections) the engine reacts to.

mod types;

pub use types::{
    DetailedPlayer, GameEvent, GameState, KillEvent, Player, PlayerRef, Squad, Team, TeamInfo,
    TeamView,
};
