//! Enforcement Executor
//!
//! Applies an aggregate through the command channel: warnings first, then
//! punishes, then kicks. A recognized channel failure only affects the
//! action that hit it; nothing is retried here. The next evaluation cycle
//! derives the same violation again and re-proposes the action.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::moderator::Moderator;
use crate::audit::AuditSink;
use crate::punitions::{ActionKind, PunishPlayer, PunitionsToApply};
use crate::rcon::{ChannelError, CommandChannel};

const KICK_FAILED_PREFIX: &str = "---> KICK FAILED, will retry <---: ";

/// What one [`PunitionExecutor::apply`] pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Warnings accepted by the server
    pub warnings: usize,
    pub punishes: usize,
    pub kicks: usize,
    /// Audited only
    pub dry_run: usize,
    /// Refused or undelivered; the next cycle proposes them again
    pub failed: usize,
}

impl ApplyReport {
    /// Actions the server accepted
    pub fn applied(&self) -> usize {
        self.warnings + self.punishes + self.kicks
    }

    fn record_applied(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Warn => self.warnings += 1,
            ActionKind::Punish => self.punishes += 1,
            ActionKind::Kick => self.kicks += 1,
        }
    }
}

enum Applied {
    Sent,
    DryRun,
}

pub struct PunitionExecutor {
    channel: Arc<dyn CommandChannel>,
    audit: Arc<dyn AuditSink>,
}

impl PunitionExecutor {
    pub fn new(channel: Arc<dyn CommandChannel>, audit: Arc<dyn AuditSink>) -> Self {
        Self { channel, audit }
    }

    /// Apply every action of `punitions`
    ///
    /// `moderators` receive `player_punish_failed` for punishes the channel
    /// refused. Only unrecognized channel errors are returned.
    pub async fn apply(
        &self,
        punitions: &PunitionsToApply,
        moderators: &[Arc<dyn Moderator>],
    ) -> Result<ApplyReport, ChannelError> {
        let mut report = ApplyReport::default();

        if punitions.is_empty() {
            debug!("Automod did not suggest any punitions");
            return Ok(report);
        }

        debug!("Automod will apply the following punitions {:?}", punitions);

        for kind in ActionKind::ALL {
            self.apply_kind(kind, punitions.of_kind(kind), moderators, &mut report)
                .await?;
        }

        Ok(report)
    }

    async fn apply_kind(
        &self,
        kind: ActionKind,
        players: &[PunishPlayer],
        moderators: &[Arc<dyn Moderator>],
        report: &mut ApplyReport,
    ) -> Result<(), ChannelError> {
        for player in players {
            match self.apply_one(kind, player).await {
                Ok(Applied::Sent) => report.record_applied(kind),
                Ok(Applied::DryRun) => report.dry_run += 1,
                Err(e) if e.is_recoverable() => {
                    report.failed += 1;
                    self.handle_failure(kind, player, &e, moderators).await;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn apply_one(
        &self,
        kind: ActionKind,
        player: &PunishPlayer,
    ) -> Result<Applied, ChannelError> {
        let details = &player.details;

        let applied = if details.dry_run {
            debug!(player_id = %player.player_id(), "Dry run, not sending {}", kind);
            Applied::DryRun
        } else {
            match kind {
                ActionKind::Warn => {
                    self.channel
                        .message_player(&player.player, &details.message, &details.author, true)
                        .await?
                }
                ActionKind::Punish => {
                    self.channel
                        .punish(&player.player, &details.message, &details.author)
                        .await?
                }
                ActionKind::Kick => {
                    self.channel
                        .kick(&player.player, &details.message, &details.author)
                        .await?
                }
            }
            info!(player_id = %player.player_id(), "Applied {} to {}", kind, player);
            Applied::Sent
        };

        self.audit(
            player,
            kind.command_name(),
            &format!("{}{}", kind.audit_prefix(), player),
        )
        .await;

        Ok(applied)
    }

    async fn handle_failure(
        &self,
        kind: ActionKind,
        player: &PunishPlayer,
        error: &ChannelError,
        moderators: &[Arc<dyn Moderator>],
    ) {
        warn!("Couldn't `{}` player `{}`. Will retry. ({})", kind, player, error);

        match kind {
            ActionKind::Punish => {
                for moderator in moderators {
                    moderator.player_punish_failed(player).await;
                }
            }
            ActionKind::Kick => {
                self.audit(
                    player,
                    kind.command_name(),
                    &format!("{}{}", KICK_FAILED_PREFIX, player),
                )
                .await;
            }
            ActionKind::Warn => {}
        }
    }

    async fn audit(&self, player: &PunishPlayer, command_name: &str, message: &str) {
        if let Some(target) = &player.details.audit_webhook {
            self.audit
                .publish(target, command_name, message, &player.details.author)
                .await;
        }
    }
}
