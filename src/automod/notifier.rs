//! Deferred Notifier
//!
//! A player's session may not accept messages right after the connect
//! event, so connect-time warnings are delivered after a grace delay.
//! Notifications are keyed by player id: scheduling again for the same
//! player cancels the earlier timer.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::game::PlayerRef;
use crate::punitions::PunishPlayer;
use crate::rcon::CommandChannel;

/// Grace delay before a just-connected player is messaged
pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_secs(20);

struct PendingNotification {
    ticket: u64,
    handle: JoinHandle<()>,
}

pub struct DeferredNotifier {
    channel: Arc<dyn CommandChannel>,
    delay: Duration,
    pending: Arc<DashMap<String, PendingNotification>>,
    next_ticket: AtomicU64,
}

impl DeferredNotifier {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Self::with_delay(channel, DEFAULT_NOTIFY_DELAY)
    }

    pub fn with_delay(channel: Arc<dyn CommandChannel>, delay: Duration) -> Self {
        Self {
            channel,
            delay,
            pending: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Schedule delivery of `warnings` to `player`, replacing any earlier
    /// schedule for the same player id
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, player: PlayerRef, warnings: Vec<PunishPlayer>) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let key = player.player_id.clone();

        // The entry lock is held until the new handle is stored, so a timer
        // firing immediately cannot observe a stale ticket.
        match self.pending.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get().handle.abort();
                debug!(player_id = %key, "Superseding pending notification");
                let handle = self.spawn_delivery(ticket, player, warnings);
                occupied.insert(PendingNotification { ticket, handle });
            }
            Entry::Vacant(vacant) => {
                let handle = self.spawn_delivery(ticket, player, warnings);
                vacant.insert(PendingNotification { ticket, handle });
            }
        }
    }

    fn spawn_delivery(
        &self,
        ticket: u64,
        player: PlayerRef,
        warnings: Vec<PunishPlayer>,
    ) -> JoinHandle<()> {
        let channel = self.channel.clone();
        let pending = self.pending.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            deliver(channel.as_ref(), &player, &warnings).await;
            pending.remove_if(&player.player_id, |_, p| p.ticket == ticket);
        })
    }

    /// Cancel the pending notification of a player, if any
    pub fn cancel(&self, player_id: &str) -> bool {
        match self.pending.remove(player_id) {
            Some((_, pending)) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, player_id: &str) -> bool {
        self.pending.contains_key(player_id)
    }
}

impl Drop for DeferredNotifier {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.handle.abort();
        }
    }
}

/// Send each warning; a failed message is logged and the rest still go out
async fn deliver(channel: &dyn CommandChannel, player: &PlayerRef, warnings: &[PunishPlayer]) {
    for warning in warnings {
        let details = &warning.details;
        if details.dry_run {
            debug!(player_id = %player.player_id, "Dry run, not messaging {}", player);
            continue;
        }

        match channel
            .message_player(player, &details.message, &details.author, false)
            .await
        {
            Ok(()) => info!(player_id = %player.player_id, "Delivered connect warning to {}", player),
            Err(e) => error!(
                "Could not message player '{}' ({}) : {}",
                player.name, player.player_id, e
            ),
        }
    }
}
