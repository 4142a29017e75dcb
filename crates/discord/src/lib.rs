//! Discord adapter.
//!
//! [`RelayHandler`] receives gateway events through serenity, normalizes
//! them into [`relay_channels::InboundMessage`] and spawns one router task
//! per message. [`DiscordOutbound`] implements the channel traits on top of
//! serenity's HTTP client.

pub mod error;
pub mod handler;
pub mod outbound;

pub use {
    error::{Error, Result},
    handler::{RelayHandler, run},
    outbound::DiscordOutbound,
};
