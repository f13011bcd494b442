//! Squad Automod Pipeline
//!
//! ## Architecture
//!
//! ```text
//!  ┌───────────┐   ┌──────────────┐
//!  │ PollLoop  │   │ AutomodHooks │◄──── EventBus (kill, connect)
//!  └─────┬─────┘   └──────┬───────┘
//!        │ engine         │ on_kill / on_connected
//!        ▼                ▼
//!  ┌──────────────────────────────┐      ┌──────────────────┐
//!  │      PunitionsToApply        │─────►│ DeferredNotifier │ (connect warnings)
//!  └──────────────┬───────────────┘      └──────────────────┘
//!                 ▼
//!  ┌──────────────────────────────┐
//!  │      PunitionExecutor        │──► CommandChannel, AuditSink
//!  └──────────────────────────────┘
//! ```
//!
//! The poll loop marks the [`WarmupGuard`] after each successful cycle; the
//! hooks do nothing until it is set. Moderators are rebuilt from
//! configuration on every cycle and every event.

pub mod engine;
mod events;
mod executor;
mod hooks;
mod moderator;
mod notifier;
mod poll;
mod warmup;

pub use events::{EventBus, EventHandler};
pub use executor::{ApplyReport, PunitionExecutor};
pub use hooks::AutomodHooks;
pub use moderator::{Moderator, ModeratorFactory, ModeratorRegistry};
pub use notifier::{DEFAULT_NOTIFY_DELAY, DeferredNotifier};
pub use poll::{CycleOutcome, DEFAULT_POLL_INTERVAL, PollLoop};
pub use warmup::{DEFAULT_WARMUP_TTL, FIRST_RUN_DONE_KEY, WarmupGuard};
