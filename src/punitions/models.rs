use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::game::{PlayerRef, Team};

/// Kind of enforcement action, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Warn,
    Punish,
    Kick,
}

impl ActionKind {
    /// All kinds in the order they are applied within one cycle
    pub const ALL: [ActionKind; 3] = [ActionKind::Warn, ActionKind::Punish, ActionKind::Kick];

    /// Remote command name, also used as the audit command name
    pub fn command_name(&self) -> &'static str {
        match self {
            ActionKind::Warn => "message_player",
            ActionKind::Punish => "punish",
            ActionKind::Kick => "kick",
        }
    }

    /// Prefix of the audit message emitted once the action succeeded
    pub fn audit_prefix(&self) -> &'static str {
        match self {
            ActionKind::Warn => "-> WARNING: ",
            ActionKind::Punish => "--> PUNISHING: ",
            ActionKind::Kick => "---> KICKING <---: ",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Warn => "warn",
            ActionKind::Punish => "punish",
            ActionKind::Kick => "kick",
        };
        f.write_str(name)
    }
}

/// Payload of a single action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishDetails {
    /// Text shown to the player (message body, punish or kick reason)
    pub message: String,
    /// Who the action is attributed to
    pub author: String,
    /// Audit the action without sending it to the server
    #[serde(default)]
    pub dry_run: bool,
    /// Webhook receiving the audit record; no audit when absent
    #[serde(default)]
    pub audit_webhook: Option<Url>,
}

impl PunishDetails {
    pub fn new(message: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            author: author.into(),
            dry_run: false,
            audit_webhook: None,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_audit_webhook(mut self, webhook: Url) -> Self {
        self.audit_webhook = Some(webhook);
        self
    }
}

/// One proposed action against one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunishPlayer {
    pub player: PlayerRef,
    pub team: Option<Team>,
    pub squad: Option<String>,
    pub role: Option<String>,
    pub level: Option<u32>,
    /// Free-form markers set by the proposing moderator
    #[serde(default)]
    pub flags: Vec<String>,
    pub details: PunishDetails,
}

impl PunishPlayer {
    pub fn new(player: PlayerRef, details: PunishDetails) -> Self {
        Self {
            player,
            team: None,
            squad: None,
            role: None,
            level: None,
            flags: Vec::new(),
            details,
        }
    }

    pub fn in_squad(mut self, team: Team, squad: impl Into<String>) -> Self {
        self.team = Some(team);
        self.squad = Some(squad.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>, level: u32) -> Self {
        self.role = Some(role.into());
        self.level = Some(level);
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.player.name
    }

    pub fn player_id(&self) -> &str {
        &self.player.player_id
    }
}

impl fmt::Display for PunishPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.player)?;
        match (&self.team, &self.squad) {
            (Some(team), Some(squad)) => write!(f, " [{}/{}]", team, squad)?,
            (Some(team), None) => write!(f, " [{}]", team)?,
            (None, Some(squad)) => write!(f, " [{}]", squad)?,
            (None, None) => {}
        }
        if !self.flags.is_empty() {
            write!(f, " {{{}}}", self.flags.join(","))?;
        }
        Ok(())
    }
}
