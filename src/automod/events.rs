use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::game::GameEvent;

/// Receives game events from an [`EventBus`]
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &GameEvent) -> Result<()>;
}

/// Source of game events
///
/// Publishers never wait on handlers: every subscriber gets its own
/// buffered receiver.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers that will see the event
    pub fn publish(&self, event: GameEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("Game event dropped, no subscriber");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    /// Subscribe `handler` and dispatch to it on a dedicated task
    ///
    /// Events are handled one at a time in arrival order, so actions for
    /// the same player keep their order.
    pub fn spawn_handler(&self, handler: Arc<dyn EventHandler>) -> JoinHandle<()> {
        let receiver = self.subscribe();
        tokio::spawn(dispatch(receiver, handler))
    }
}

async fn dispatch(mut receiver: broadcast::Receiver<GameEvent>, handler: Arc<dyn EventHandler>) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if let Err(e) = handler.handle(&event).await {
                    error!(
                        player_id = %event.subject().player_id,
                        "Game event handler failed: {:#}",
                        e
                    );
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event dispatch lagging, {} game events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Event source closed, stopping dispatch");
                break;
            }
        }
    }
}
