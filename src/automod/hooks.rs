//! Event Hooks
//!
//! Abbreviated evaluation passes triggered by single game events instead of
//! the full table. Both hooks stay inert until the warm-up guard is ready.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use super::events::EventHandler;
use super::executor::PunitionExecutor;
use super::moderator::{Moderator, ModeratorRegistry};
use super::notifier::DeferredNotifier;
use super::warmup::WarmupGuard;
use crate::game::{DetailedPlayer, GameEvent, KillEvent, PlayerRef};
use crate::punitions::PunitionsToApply;
use crate::rcon::{ChannelError, CommandChannel};

pub struct AutomodHooks {
    channel: Arc<dyn CommandChannel>,
    registry: Arc<ModeratorRegistry>,
    executor: Arc<PunitionExecutor>,
    guard: Arc<WarmupGuard>,
    notifier: Arc<DeferredNotifier>,
}

impl AutomodHooks {
    pub fn new(
        channel: Arc<dyn CommandChannel>,
        registry: Arc<ModeratorRegistry>,
        executor: Arc<PunitionExecutor>,
        guard: Arc<WarmupGuard>,
        notifier: Arc<DeferredNotifier>,
    ) -> Self {
        Self {
            channel,
            registry,
            executor,
            guard,
            notifier,
        }
    }

    /// Enabled moderators, or `None` while warming up or when none is enabled
    async fn active_moderators(&self, event_name: &str) -> Option<Vec<Arc<dyn Moderator>>> {
        if !self.guard.is_ready().await {
            debug!(
                "{} event received, but no automod run done yet, giving mods time to warmup",
                event_name
            );
            return None;
        }

        let moderators = self.registry.enabled_moderators().await;
        if moderators.is_empty() {
            debug!("No automod is enabled");
            return None;
        }

        Some(moderators)
    }

    pub async fn on_kill(&self, event: &KillEvent) -> Result<(), ChannelError> {
        let Some(moderators) = self.active_moderators("Kill").await else {
            return Ok(());
        };

        let mut punitions = PunitionsToApply::new();
        for moderator in &moderators {
            match moderator.on_kill(event).await {
                Ok(proposed) => punitions.merge(proposed),
                Err(e) => error!(
                    moderator = %moderator.name(),
                    "Kill hook failed: {:#}",
                    e
                ),
            }
        }

        self.executor.apply(&punitions, &moderators).await?;
        Ok(())
    }

    pub async fn on_connected(&self, player: &PlayerRef) -> Result<(), ChannelError> {
        let Some(moderators) = self.active_moderators("Connected").await else {
            return Ok(());
        };

        let detail: Option<DetailedPlayer> =
            match self.channel.get_detailed_player_info(&player.name).await {
                Ok(detail) => Some(detail),
                Err(e) => {
                    error!(
                        "get_detailed_player_info failed for {}: {}",
                        player.name, e
                    );
                    None
                }
            };

        let mut punitions = PunitionsToApply::new();
        for moderator in &moderators {
            match moderator
                .on_connected(&player.name, &player.player_id, detail.as_ref())
                .await
            {
                Ok(proposed) => punitions.merge(proposed),
                Err(e) => error!(
                    moderator = %moderator.name(),
                    "Connect hook failed: {:#}",
                    e
                ),
            }
        }

        // Only warnings wait for the session; the rest applies now
        let warnings = punitions.take_warnings();
        if !warnings.is_empty() {
            self.notifier.schedule(player.clone(), warnings);
        }

        self.executor.apply(&punitions, &moderators).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for AutomodHooks {
    async fn handle(&self, event: &GameEvent) -> Result<()> {
        match event {
            GameEvent::Kill(kill) => self.on_kill(kill).await?,
            GameEvent::Connected { player, .. } => self.on_connected(player).await?,
        }
        Ok(())
    }
}
