use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// How often the service sweeps expired keys
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Keyed store with per-key expiry
///
/// Implementations must make `set_with_expiry` and `exists` atomic with
/// respect to each other; callers add no locking of their own.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: &str) -> Result<()>;

    /// Returns whether the key was present
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Drop expired keys, returning how many were removed
    ///
    /// Stores that expire keys themselves keep the default.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Purge `store` every `every` until the task is aborted
pub fn spawn_sweeper(store: Arc<dyn KeyStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!("Purged {} expired key(s)", removed),
                Err(e) => debug!("Key sweep failed: {:#}", e),
            }
        }
    })
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process key store
///
/// Expired keys are dropped lazily when touched.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: DashMap<String, Entry>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Number of unexpired keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry (call periodically)
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: &str) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.cleanup())
    }
}
