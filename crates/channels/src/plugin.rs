use {
    async_trait::async_trait,
    relay_common::{ChannelId, GuildId, MessageId, UserId},
};

use crate::error::Result;

/// A message the bot can address: reply to, edit or react on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl MessageRef {
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

/// The kind of channel a message arrived in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelKind {
    /// A regular text channel in a guild; threads can be started here.
    #[default]
    GuildText,
    /// Already inside a thread.
    Thread,
    /// A direct message.
    Direct,
    Other,
}

/// A file attached to an inbound message, already downloaded.
#[derive(Debug, Clone)]
pub struct ChannelAttachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ChannelAttachment {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// The message an inbound message replies to.
#[derive(Debug, Clone)]
pub struct ReplyReference {
    pub target: MessageRef,
    /// Raw text of the referenced message when the platform inlined it.
    pub content: Option<String>,
}

/// One inbound chat event, normalized by the platform adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub channel_kind: ChannelKind,
    pub author_id: UserId,
    pub content: String,
    /// The platform's own mention list included the bot.
    pub mentions_bot: bool,
    pub reference: Option<ReplyReference>,
    pub attachments: Vec<ChannelAttachment>,
}

impl InboundMessage {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.channel_id, self.message_id)
    }
}

/// Who the bot is on the platform.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub user_id: UserId,
    pub name: String,
}

/// Send and mutate messages on a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Post `text` in `channel_id`, optionally as a reply.
    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef>;

    /// Replace the content of a message the bot authored.
    async fn edit_message(&self, message: MessageRef, text: &str) -> Result<()>;

    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> Result<()>;

    async fn remove_reaction(&self, message: MessageRef, emoji: &str) -> Result<()>;

    /// Start a thread from `from` and return the new thread's channel.
    async fn create_thread(
        &self,
        from: MessageRef,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ChannelId>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _channel_id: ChannelId) -> Result<()> {
        Ok(())
    }
}

/// Read access to earlier messages.
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    /// Raw text of `message`, or `None` if it no longer exists.
    async fn fetch_message_text(&self, message: MessageRef) -> Result<Option<String>>;
}
