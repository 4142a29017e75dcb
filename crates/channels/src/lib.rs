//! Chat platform abstraction.
//!
//! A platform adapter (Discord today) normalizes inbound events into
//! [`InboundMessage`] and implements [`ChannelOutbound`] and
//! [`ChannelHistory`] so the relay core never talks to a platform SDK.

pub mod error;
pub mod gating;
pub mod mentions;
pub mod plugin;

pub use {
    error::{Error, Result},
    gating::AccessPolicy,
    plugin::{
        BotIdentity, ChannelAttachment, ChannelHistory, ChannelKind, ChannelOutbound,
        InboundMessage, MessageRef, ReplyReference,
    },
};
