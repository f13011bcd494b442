//! External Stores
//!
//! - `KeyStore`: expiring keyed values shared by the warm-up guard and by
//!   moderators that need memory across poll cycles
//! - `ConfigStore`: per-moderator configuration, read fresh on every cycle

mod config_store;
mod keystore;

pub use config_store::{
    ConfigStore, JsonFileConfigStore, MemoryConfigStore, decode_config, load_config,
};
pub use keystore::{DEFAULT_SWEEP_INTERVAL, KeyStore, MemoryKeyStore, spawn_sweeper};
