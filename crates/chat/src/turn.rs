use std::fmt;

use {
    relay_channels::MessageRef,
    relay_common::{ChannelId, Continuation, MessageId},
};

/// Lifecycle of one turn, traced at `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingContext,
    Generating,
    Flushing,
    Sealed,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingContext => "awaiting_context",
            Self::Generating => "generating",
            Self::Flushing => "flushing",
            Self::Sealed => "sealed",
        };
        f.write_str(s)
    }
}

/// Where the first outgoing message of a turn lands.
#[derive(Debug, Clone)]
pub struct TurnTarget {
    /// The user message that triggered the turn.
    pub origin: MessageRef,
    /// Start a thread from `origin` with this name and answer inside it.
    pub thread_name: Option<String>,
}

impl TurnTarget {
    pub fn reply_to(origin: MessageRef) -> Self {
        Self {
            origin,
            thread_name: None,
        }
    }

    pub fn in_thread(origin: MessageRef, name: impl Into<String>) -> Self {
        Self {
            origin,
            thread_name: Some(name.into()),
        }
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Every message the bot sent, in order.
    pub messages: Vec<MessageRef>,
    /// Present when the backend finished cleanly.
    pub continuation: Option<Continuation>,
}

impl TurnOutcome {
    pub fn last_message(&self) -> Option<MessageRef> {
        self.messages.last().copied()
    }

    /// Channel the answer ended up in (the thread, when one was created).
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.last_message().map(|m| m.channel_id)
    }

    pub fn last_message_id(&self) -> Option<MessageId> {
        self.last_message().map(|m| m.message_id)
    }
}
