//! Squad Automod
//!
//! Rule-based enforcement for a team-based multiplayer game server. Pluggable
//! moderators inspect the squad layout of both teams, propose warnings,
//! punishes and kicks, and the engine applies them through the server's
//! remote command channel while auditing every action.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── config.rs      - Configuration management
//! ├── telemetry.rs   - Logging setup
//! ├── service.rs     - Component wiring and task lifecycle
//! ├── game/          - Match state model (teams, squads, players, events)
//! ├── punitions/     - Proposed actions and their aggregate
//! ├── rcon/          - Command channel trait, HTTP client, serialization
//! ├── audit/         - Audit webhook sink
//! ├── store/         - Expiring key store, moderator configuration store
//! └── automod/       - Enforcement pipeline
//!     ├── moderator.rs - Moderator capability, factories, registry
//!     ├── engine.rs    - Full-table evaluation
//!     ├── executor.rs  - Ordered application with failure handling
//!     ├── warmup.rs    - Warm-up guard
//!     ├── poll.rs      - Steady-state poll loop
//!     ├── hooks.rs     - Kill and connect hooks
//!     ├── notifier.rs  - Deferred connect notifications
//!     └── events.rs    - Event bus and dispatch
//! ```

pub mod audit;
pub mod automod;
pub mod config;
pub mod game;
pub mod punitions;
pub mod rcon;
pub mod service;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use config::AutomodConfig;
pub use service::{AutomodHandle, AutomodService};

pub use automod::{
    ApplyReport, AutomodHooks, CycleOutcome, DeferredNotifier, EventBus, EventHandler, Moderator,
    ModeratorFactory, ModeratorRegistry, PollLoop, PunitionExecutor, WarmupGuard,
};
pub use game::{
    DetailedPlayer, GameEvent, GameState, KillEvent, Player, PlayerRef, Squad, Team, TeamInfo,
    TeamView,
};
pub use punitions::{ActionKind, PunishDetails, PunishPlayer, PunitionsToApply};
pub use rcon::{ChannelError, CommandChannel, RconHttpClient, SerializedChannel};

// Re-export audit and store types
pub use audit::{AuditSink, DiscordWebhookAudit, NoopAudit};
pub use store::{ConfigStore, JsonFileConfigStore, KeyStore, MemoryConfigStore, MemoryKeyStore};
