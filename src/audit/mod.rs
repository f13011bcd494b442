//! Audit Sink
//!
//! Fire-and-forget publication of enforcement records to an external
//! webhook. Delivery failures are logged here and never reach the caller.

mod sink;

pub use sink::{AuditSink, DiscordWebhookAudit, NoopAudit};
