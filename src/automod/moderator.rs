use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use crate::game::{DetailedPlayer, GameState, KillEvent, Squad, Team, TeamView};
use crate::punitions::{PunishPlayer, PunitionsToApply};
use crate::store::{ConfigStore, KeyStore};

/// A pluggable rule module
///
/// Instances live for one evaluation only; anything a rule must remember
/// between cycles goes through the shared [`KeyStore`]. The event hooks
/// and the failure callback default to no-ops, so a rule only overrides
/// the ones it supports.
#[async_trait]
pub trait Moderator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn enabled(&self) -> bool;

    /// Evaluate one squad (or the commander pseudo-squad) of `team`
    async fn punitions_to_apply(
        &self,
        team_view: &TeamView,
        squad_name: &str,
        team: Team,
        squad: &Squad,
        game_state: &GameState,
    ) -> Result<PunitionsToApply>;

    /// Incremental evaluation of a single kill
    async fn on_kill(&self, _event: &KillEvent) -> Result<PunitionsToApply> {
        Ok(PunitionsToApply::default())
    }

    /// Evaluation of a player who just finished connecting
    async fn on_connected(
        &self,
        _name: &str,
        _player_id: &str,
        _detail: Option<&DetailedPlayer>,
    ) -> Result<PunitionsToApply> {
        Ok(PunitionsToApply::default())
    }

    /// A punish proposed by some moderator could not be applied
    async fn player_punish_failed(&self, _player: &PunishPlayer) {}
}

/// Builds one kind of moderator from its current configuration
pub trait ModeratorFactory: Send + Sync {
    /// Key of this moderator's entry in the [`ConfigStore`]
    fn config_key(&self) -> &str;

    fn build(
        &self,
        config: Option<serde_json::Value>,
        store: Arc<dyn KeyStore>,
    ) -> Result<Arc<dyn Moderator>>;
}

/// The known moderator kinds and where their configuration lives
pub struct ModeratorRegistry {
    factories: Vec<Arc<dyn ModeratorFactory>>,
    config: Arc<dyn ConfigStore>,
    store: Arc<dyn KeyStore>,
}

impl ModeratorRegistry {
    pub fn new(config: Arc<dyn ConfigStore>, store: Arc<dyn KeyStore>) -> Self {
        Self {
            factories: Vec::new(),
            config,
            store,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ModeratorFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn register(&mut self, factory: Arc<dyn ModeratorFactory>) {
        self.factories.push(factory);
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    /// Build a fresh set of moderators from current configuration, keeping
    /// only enabled ones
    ///
    /// A kind whose configuration cannot be loaded or built is skipped for
    /// this cycle.
    pub async fn enabled_moderators(&self) -> Vec<Arc<dyn Moderator>> {
        let mut moderators = Vec::with_capacity(self.factories.len());

        for factory in &self.factories {
            let key = factory.config_key();

            let raw = match self.config.load(key).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!(moderator = %key, "Failed to load moderator configuration: {:#}", e);
                    continue;
                }
            };

            match factory.build(raw, self.store.clone()) {
                Ok(moderator) if moderator.enabled() => moderators.push(moderator),
                Ok(_) => debug!(moderator = %key, "Moderator disabled"),
                Err(e) => {
                    error!(moderator = %key, "Failed to build moderator: {:#}", e);
                }
            }
        }

        moderators
    }
}
