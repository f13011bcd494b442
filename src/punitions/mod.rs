//! Punitions
//!
//! Proposed enforcement actions and the aggregate that merges them across
//! moderators.
//!
//! ## Escalation
//!
//! ```text
//! Warn ──► Punish ──► Kick
//! ```
//!
//! An aggregate keeps one ordered collection per [`ActionKind`]. Merging
//! concatenates same-kind collections; the executor always drains them in
//! escalation order.

mod aggregate;
mod models;

pub use aggregate::PunitionsToApply;
pub use models::{ActionKind, PunishDetails, PunishPlayer};
