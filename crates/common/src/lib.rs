//! Shared identifiers and error plumbing used across all llama-relay crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::{ChannelId, Continuation, GuildId, MessageId, UserId},
};
