use std::{sync::Arc, time::Duration};

use {
    relay_common::{ChannelId, MessageId},
    tracing::{debug, trace},
};

use crate::{
    error::Result,
    kv::KeyValueStore,
    state::{ConversationState, TurnRecord, decode_images, encode_images},
};

/// Key categories under the store prefix.
const CHANNEL: &str = "channel";
const MESSAGE: &str = "message";
const IMAGES: &str = "images";

/// Conversation state persistence on top of a [`KeyValueStore`].
///
/// Each completed turn is written under the bot message that finished it
/// (for reply lookups) and under its channel (for "continue the most recent
/// conversation" lookups). Writes are last-writer-wins; every key is written
/// only by the turn that owns it.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    prefix: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kv,
            prefix: prefix.into(),
            ttl,
        }
    }

    fn key(&self, category: &str, id: impl std::fmt::Display) -> String {
        format!("{}:{category}:{id}", self.prefix)
    }

    /// State of the turn completed by `message_id`, if any.
    pub async fn load_message(&self, message_id: MessageId) -> Result<Option<ConversationState>> {
        let key = self.key(MESSAGE, message_id);
        self.load_record(&key).await
    }

    /// State of the most recent turn completed in `channel_id`, if any.
    pub async fn load_channel(&self, channel_id: ChannelId) -> Result<Option<ConversationState>> {
        let key = self.key(CHANNEL, channel_id);
        self.load_record(&key).await
    }

    async fn load_record(&self, key: &str) -> Result<Option<ConversationState>> {
        let Some(raw) = self.kv.get(key).await? else {
            trace!(key, "no stored turn");
            return Ok(None);
        };
        let record = TurnRecord::decode(&raw)?;
        let images = match self.kv.get(&self.key(IMAGES, record.message_id)).await? {
            Some(raw) => decode_images(&raw)?,
            None => Vec::new(),
        };
        debug!(
            key,
            message_id = %record.message_id,
            context_len = record.continuation.context.len(),
            images = images.len(),
            "loaded stored turn"
        );
        Ok(Some(ConversationState::new(record.continuation, images)))
    }

    /// Persist a completed turn under its channel and its final bot message.
    pub async fn save(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        state: &ConversationState,
    ) -> Result<()> {
        let record = TurnRecord {
            continuation: state.continuation.clone(),
            message_id,
        }
        .encode()?;

        if !state.images.is_empty() {
            let images = encode_images(&state.images)?;
            self.kv
                .set_ex(&self.key(IMAGES, message_id), &images, self.ttl)
                .await?;
        }
        self.kv
            .set_ex(&self.key(MESSAGE, message_id), &record, self.ttl)
            .await?;
        self.kv
            .set_ex(&self.key(CHANNEL, channel_id), &record, self.ttl)
            .await?;

        debug!(
            %channel_id,
            %message_id,
            context_len = state.continuation.context.len(),
            images = state.images.len(),
            "saved turn"
        );
        Ok(())
    }
}
