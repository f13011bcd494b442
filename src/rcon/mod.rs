//! Command Channel
//!
//! The narrow interface the engine uses to read match state and to act on
//! players, plus the HTTP implementation and a single-writer wrapper.

mod channel;
mod client;

pub use channel::{ChannelError, CommandChannel, SerializedChannel};
pub use client::RconHttpClient;
