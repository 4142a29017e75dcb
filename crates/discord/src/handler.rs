//! Discord event handler for serenity.
//!
//! Implements the EventHandler trait to receive and process Discord events.

use std::sync::{Arc, OnceLock};

use {
    relay_channels::{
        BotIdentity, ChannelAttachment, ChannelKind, InboundMessage, MessageRef, ReplyReference,
        mentions::mentions,
    },
    relay_chat::Router,
    relay_common::{ChannelId, GuildId, MessageId, UserId},
    serenity::{
        all::{
            ActivityData, Channel, ChannelType, Client, Context, EventHandler, GatewayIntents,
            GuildId as SerenityGuildId, Message, Permissions, Ready,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// Handler for Discord gateway events.
pub struct RelayHandler {
    router: Arc<Router>,
    presence: String,
    bot: OnceLock<BotIdentity>,
}

impl RelayHandler {
    pub fn new(router: Arc<Router>, presence: impl Into<String>) -> Self {
        Self {
            router,
            presence: presence.into(),
            bot: OnceLock::new(),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn to_inbound(&self, ctx: &Context, msg: &Message, bot: &BotIdentity) -> InboundMessage {
        let channel_id = ChannelId(msg.channel_id.get());
        let channel_kind = match msg.channel(ctx).await {
            Ok(Channel::Guild(c)) => channel_kind(c.kind),
            Ok(Channel::Private(_)) => ChannelKind::Direct,
            Ok(_) => ChannelKind::Other,
            Err(e) => {
                debug!(%channel_id, error = %e, "channel lookup failed");
                ChannelKind::Other
            },
        };

        let reference = msg.message_reference.as_ref().and_then(|r| {
            let message_id = r.message_id?;
            Some(ReplyReference {
                target: MessageRef::new(ChannelId(r.channel_id.get()), MessageId(message_id.get())),
                content: msg.referenced_message.as_ref().map(|m| m.content.clone()),
            })
        });

        let mut attachments = Vec::new();
        for attachment in &msg.attachments {
            let is_image = attachment
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"));
            if !is_image {
                continue;
            }
            match attachment.download().await {
                Ok(data) => attachments.push(ChannelAttachment {
                    filename: attachment.filename.clone(),
                    content_type: attachment.content_type.clone(),
                    data,
                }),
                Err(e) => warn!(
                    filename = %attachment.filename,
                    error = %e,
                    "attachment download failed"
                ),
            }
        }

        InboundMessage {
            message_id: MessageId(msg.id.get()),
            channel_id,
            guild_id: msg.guild_id.map(|g| GuildId(g.get())),
            channel_kind,
            author_id: UserId(msg.author.id.get()),
            content: msg.content.clone(),
            mentions_bot: msg.mentions.iter().any(|u| u.id.get() == bot.user_id.get()),
            reference,
            attachments,
        }
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text => ChannelKind::GuildText,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => {
            ChannelKind::Thread
        },
        ChannelType::Private => ChannelKind::Direct,
        _ => ChannelKind::Other,
    }
}

/// Permissions requested by the invite link.
fn invite_permissions() -> Permissions {
    Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::SEND_MESSAGES_IN_THREADS
        | Permissions::CREATE_PUBLIC_THREADS
        | Permissions::ADD_REACTIONS
        | Permissions::READ_MESSAGE_HISTORY
}

fn invite_url(application_id: u64) -> String {
    format!(
        "https://discord.com/api/oauth2/authorize?client_id={application_id}&permissions={}&scope=bot",
        invite_permissions().bits()
    )
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Some(ActivityData::custom(self.presence.clone())));

        let identity = BotIdentity {
            user_id: UserId(ready.user.id.get()),
            name: ready.user.name.clone(),
        };
        if self.bot.set(identity).is_err() {
            debug!("gateway reconnected, keeping bot identity");
        }

        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            invite_url = %invite_url(ready.application.id.get()),
            "discord bot ready"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(bot) = self.bot.get().cloned() else {
            debug!("message before ready ignored");
            return;
        };

        // Skip our own messages and anything not addressed to us before
        // paying for attachment downloads; the router re-checks both.
        if msg.author.id.get() == bot.user_id.get() {
            return;
        }
        let addressed = msg.mentions.iter().any(|u| u.id.get() == bot.user_id.get())
            || mentions(&msg.content, bot.user_id);
        if !addressed {
            return;
        }

        let inbound = self.to_inbound(&ctx, &msg, &bot).await;
        debug!(
            message_id = %inbound.message_id,
            channel_id = %inbound.channel_id,
            kind = ?inbound.channel_kind,
            attachments = inbound.attachments.len(),
            "discord mention received"
        );

        let router = Arc::clone(&self.router);
        tokio::spawn(async move {
            let message_id = inbound.message_id;
            if let Err(e) = router.handle(&bot, inbound).await {
                warn!(%message_id, error = %e, "turn failed");
            }
        });
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<SerenityGuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }
}

/// Connect to the gateway and serve events until the connection ends.
pub async fn run(token: &str, handler: RelayHandler) -> Result<()> {
    if token.trim().is_empty() {
        return Err(Error::MissingToken);
    }
    let mut client = Client::builder(token, RelayHandler::intents())
        .event_handler(handler)
        .await?;
    info!("connecting to discord gateway");
    client.start().await?;
    Ok(())
}
