use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Source of per-moderator configuration
///
/// Values are opaque JSON to the engine; each moderator decodes its own.
/// Callers re-read on every cycle so toggles apply without a restart.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;
}

/// Decode a raw configuration value, falling back to defaults when absent
pub fn decode_config<T: DeserializeOwned + Default>(raw: Option<serde_json::Value>) -> Result<T> {
    match raw {
        Some(value) => serde_json::from_value(value).context("Invalid moderator configuration"),
        None => Ok(T::default()),
    }
}

/// Load and decode the configuration stored under `key`
pub async fn load_config<T: DeserializeOwned + Default>(
    store: &dyn ConfigStore,
    key: &str,
) -> Result<T> {
    let raw = store.load(key).await?;
    decode_config(raw).with_context(|| format!("Failed to decode configuration `{}`", key))
}

/// Configuration held in memory, editable at runtime
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: &str, value: serde_json::Value) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    pub async fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.write().await.remove(key)
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

/// Configuration file holding one JSON object keyed by moderator
///
/// The file is read on every load; a missing file means "no configuration".
#[derive(Debug, Clone)]
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No moderator configuration at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read moderator configuration {}", self.path.display())
                });
            }
        };

        let mut document: HashMap<String, serde_json::Value> = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", self.path.display()))?;

        Ok(document.remove(key))
    }
}
