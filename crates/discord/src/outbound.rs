use std::sync::Arc;

use {
    async_trait::async_trait,
    relay_channels::{ChannelHistory, ChannelOutbound, Error, MessageRef, Result},
    relay_common::{ChannelId, MessageId},
    serenity::{
        all::{
            AutoArchiveDuration, ChannelId as SerenityChannelId, CreateMessage, CreateThread,
            EditMessage, MessageId as SerenityMessageId, ReactionType,
        },
        http::Http,
    },
    tracing::debug,
};

/// Channel operations over Discord's REST API.
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }
}

fn channel(id: ChannelId) -> SerenityChannelId {
    SerenityChannelId::new(id.get())
}

fn message(id: MessageId) -> SerenityMessageId {
    SerenityMessageId::new(id.get())
}

fn reaction(emoji: &str) -> ReactionType {
    ReactionType::Unicode(emoji.to_string())
}

fn auto_archive(minutes: u16) -> AutoArchiveDuration {
    match minutes {
        0..=60 => AutoArchiveDuration::OneHour,
        61..=1440 => AutoArchiveDuration::OneDay,
        1441..=4320 => AutoArchiveDuration::ThreeDays,
        _ => AutoArchiveDuration::OneWeek,
    }
}

#[async_trait]
impl ChannelOutbound for DiscordOutbound {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        let mut builder = CreateMessage::new().content(text);
        if let Some(reply_to) = reply_to {
            builder = builder.reference_message((channel(channel_id), message(reply_to)));
        }
        let sent = channel(channel_id)
            .send_message(&*self.http, builder)
            .await
            .map_err(|e| Error::external("discord send message", e))?;
        Ok(MessageRef::new(
            ChannelId(sent.channel_id.get()),
            MessageId(sent.id.get()),
        ))
    }

    async fn edit_message(&self, target: MessageRef, text: &str) -> Result<()> {
        channel(target.channel_id)
            .edit_message(
                &*self.http,
                message(target.message_id),
                EditMessage::new().content(text),
            )
            .await
            .map_err(|e| Error::external("discord edit message", e))?;
        Ok(())
    }

    async fn add_reaction(&self, target: MessageRef, emoji: &str) -> Result<()> {
        channel(target.channel_id)
            .create_reaction(&*self.http, message(target.message_id), reaction(emoji))
            .await
            .map_err(|e| Error::external("discord add reaction", e))
    }

    async fn remove_reaction(&self, target: MessageRef, emoji: &str) -> Result<()> {
        // No user removes the bot's own reaction.
        channel(target.channel_id)
            .delete_reaction(&*self.http, message(target.message_id), None, reaction(emoji))
            .await
            .map_err(|e| Error::external("discord remove reaction", e))
    }

    async fn create_thread(
        &self,
        from: MessageRef,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ChannelId> {
        let thread = channel(from.channel_id)
            .create_thread_from_message(
                &*self.http,
                message(from.message_id),
                CreateThread::new(name).auto_archive_duration(auto_archive(auto_archive_minutes)),
            )
            .await
            .map_err(|e| Error::external("discord create thread", e))?;
        debug!(thread_id = thread.id.get(), name, "discord thread created");
        Ok(ChannelId(thread.id.get()))
    }

    async fn send_typing(&self, channel_id: ChannelId) -> Result<()> {
        channel(channel_id)
            .broadcast_typing(&*self.http)
            .await
            .map_err(|e| Error::external("discord typing", e))
    }
}

#[async_trait]
impl ChannelHistory for DiscordOutbound {
    async fn fetch_message_text(&self, target: MessageRef) -> Result<Option<String>> {
        let fetched = self
            .http
            .get_message(channel(target.channel_id), message(target.message_id))
            .await
            .map_err(|e| Error::external("discord fetch message", e))?;
        Ok(Some(fetched.content))
    }
}
