use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::store::KeyStore;

/// Key marking that a full poll cycle completed recently
pub const FIRST_RUN_DONE_KEY: &str = "first_run_done";

/// How long one completed cycle keeps the event hooks enabled
pub const DEFAULT_WARMUP_TTL: Duration = Duration::from_secs(4 * 60);

/// Gate for event-driven enforcement
///
/// Event hooks stay inert until the poll loop has seen at least one full
/// table. The flag expires on its own if the loop stops marking it.
pub struct WarmupGuard {
    store: Arc<dyn KeyStore>,
    ttl: Duration,
}

impl WarmupGuard {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_ttl(store, DEFAULT_WARMUP_TTL)
    }

    pub fn with_ttl(store: Arc<dyn KeyStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// An unreadable store counts as not ready
    pub async fn is_ready(&self) -> bool {
        match self.store.exists(FIRST_RUN_DONE_KEY).await {
            Ok(ready) => ready,
            Err(e) => {
                warn!("Could not read warm-up flag: {:#}", e);
                false
            }
        }
    }

    pub async fn mark_ready(&self) -> Result<()> {
        self.store
            .set_with_expiry(FIRST_RUN_DONE_KEY, self.ttl, "1")
            .await
            .context("Failed to set warm-up flag")
    }
}
