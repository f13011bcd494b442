use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::game::{DetailedPlayer, GameState, PlayerRef, TeamView};

/// Failure of a remote command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The server refused the command
    #[error("command `{command}` rejected: {reason}")]
    CommandRejected { command: String, reason: String },

    /// The server could not be reached or answered with a server error
    #[error("command channel unavailable: {0}")]
    Unavailable(String),

    /// Malformed or unexpected response
    #[error("command channel protocol error: {0}")]
    Protocol(String),
}

impl ChannelError {
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        ChannelError::CommandRejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Failures the executor recovers from by waiting for the next cycle
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChannelError::CommandRejected { .. } | ChannelError::Unavailable(_)
        )
    }
}

/// Remote command channel to the game server
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn get_team_view(&self) -> Result<TeamView, ChannelError>;

    async fn get_game_state(&self) -> Result<GameState, ChannelError>;

    async fn get_detailed_player_info(
        &self,
        player_name: &str,
    ) -> Result<DetailedPlayer, ChannelError>;

    /// Send a direct message; `save_message` keeps it in the player's history
    async fn message_player(
        &self,
        player: &PlayerRef,
        message: &str,
        by: &str,
        save_message: bool,
    ) -> Result<(), ChannelError>;

    async fn punish(&self, player: &PlayerRef, reason: &str, by: &str)
    -> Result<(), ChannelError>;

    async fn kick(&self, player: &PlayerRef, reason: &str, by: &str) -> Result<(), ChannelError>;
}

#[async_trait]
impl<C: CommandChannel + ?Sized> CommandChannel for Arc<C> {
    async fn get_team_view(&self) -> Result<TeamView, ChannelError> {
        (**self).get_team_view().await
    }

    async fn get_game_state(&self) -> Result<GameState, ChannelError> {
        (**self).get_game_state().await
    }

    async fn get_detailed_player_info(
        &self,
        player_name: &str,
    ) -> Result<DetailedPlayer, ChannelError> {
        (**self).get_detailed_player_info(player_name).await
    }

    async fn message_player(
        &self,
        player: &PlayerRef,
        message: &str,
        by: &str,
        save_message: bool,
    ) -> Result<(), ChannelError> {
        (**self)
            .message_player(player, message, by, save_message)
            .await
    }

    async fn punish(
        &self,
        player: &PlayerRef,
        reason: &str,
        by: &str,
    ) -> Result<(), ChannelError> {
        (**self).punish(player, reason, by).await
    }

    async fn kick(&self, player: &PlayerRef, reason: &str, by: &str) -> Result<(), ChannelError> {
        (**self).kick(player, reason, by).await
    }
}

/// Single-writer wrapper: at most one call reaches the inner channel at a time
///
/// The poll loop, the event hooks and the notifier timers all share one
/// channel; this keeps their calls from interleaving on the wire.
pub struct SerializedChannel<C> {
    inner: C,
    lock: Mutex<()>,
}

impl<C: CommandChannel> SerializedChannel<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CommandChannel> CommandChannel for SerializedChannel<C> {
    async fn get_team_view(&self) -> Result<TeamView, ChannelError> {
        let _guard = self.lock.lock().await;
        self.inner.get_team_view().await
    }

    async fn get_game_state(&self) -> Result<GameState, ChannelError> {
        let _guard = self.lock.lock().await;
        self.inner.get_game_state().await
    }

    async fn get_detailed_player_info(
        &self,
        player_name: &str,
    ) -> Result<DetailedPlayer, ChannelError> {
        let _guard = self.lock.lock().await;
        self.inner.get_detailed_player_info(player_name).await
    }

    async fn message_player(
        &self,
        player: &PlayerRef,
        message: &str,
        by: &str,
        save_message: bool,
    ) -> Result<(), ChannelError> {
        let _guard = self.lock.lock().await;
        self.inner
            .message_player(player, message, by, save_message)
            .await
    }

    async fn punish(
        &self,
        player: &PlayerRef,
        reason: &str,
        by: &str,
    ) -> Result<(), ChannelError> {
        let _guard = self.lock.lock().await;
        self.inner.punish(player, reason, by).await
    }

    async fn kick(&self, player: &PlayerRef, reason: &str, by: &str) -> Result<(), ChannelError> {
        let _guard = self.lock.lock().await;
        self.inner.kick(player, reason, by).await
    }
}
