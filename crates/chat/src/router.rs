//! Per-event entry point: decides whether to answer, assembles the prompt
//! and context, runs generation through the reconciler and persists the
//! resulting conversation state.

use std::{sync::Arc, time::Duration};

use {
    relay_channels::{
        AccessPolicy, BotIdentity, ChannelHistory, ChannelKind, ChannelOutbound, InboundMessage,
        mentions::{mentions, strip_mentions},
    },
    relay_config::RelayConfig,
    relay_providers::{GenerationRequest, InferenceBackend},
    relay_sessions::{ConversationState, SessionStore},
    tracing::{debug, info, warn},
};

use crate::{
    error::Result,
    knowledge::DocumentRetriever,
    prompt::{fold_reference, frame_with_documents},
    reconciler::{Reconciler, ReconcilerConfig},
    thinking::ThinkingIndicator,
    turn::{TurnOutcome, TurnPhase, TurnTarget},
};

/// Behaviour knobs for [`Router`].
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub model: String,
    /// Used instead of `model` when the turn carries images.
    pub vision_model: Option<String>,
    pub default_prompt: String,
    /// Answer guild text messages in a new thread.
    pub threads: bool,
    pub thinking_timeout: Duration,
    pub document_results: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            model: "llama2".into(),
            vision_model: None,
            default_prompt: "Hi!".into(),
            threads: true,
            thinking_timeout: Duration::from_secs(999),
            document_results: 2,
        }
    }
}

impl From<&RelayConfig> for RouterSettings {
    fn from(cfg: &RelayConfig) -> Self {
        Self {
            model: cfg.ollama.model.clone(),
            vision_model: cfg.ollama.vision_model.clone(),
            default_prompt: cfg.discord.default_prompt.clone(),
            threads: cfg.discord.threads,
            thinking_timeout: Duration::from_secs(cfg.discord.thinking_timeout_secs),
            document_results: cfg.knowledge.results,
        }
    }
}

pub struct Router {
    backend: Arc<dyn InferenceBackend>,
    sessions: SessionStore,
    outbound: Arc<dyn ChannelOutbound>,
    history: Arc<dyn ChannelHistory>,
    retriever: Option<Arc<dyn DocumentRetriever>>,
    access: AccessPolicy,
    reconciler: ReconcilerConfig,
    settings: RouterSettings,
}

impl Router {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        sessions: SessionStore,
        outbound: Arc<dyn ChannelOutbound>,
        history: Arc<dyn ChannelHistory>,
    ) -> Self {
        Self {
            backend,
            sessions,
            outbound,
            history,
            retriever: None,
            access: AccessPolicy::default(),
            reconciler: ReconcilerConfig::default(),
            settings: RouterSettings::default(),
        }
    }

    /// Apply every config-driven knob at once.
    #[must_use]
    pub fn configured(self, cfg: &RelayConfig) -> Self {
        self.with_settings(RouterSettings::from(cfg))
            .with_reconciler(ReconcilerConfig::from(&cfg.stream))
            .with_access(AccessPolicy::new(
                cfg.discord.guild_allowlist.clone(),
                cfg.discord.channel_allowlist.clone(),
            ))
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_reconciler(mut self, config: ReconcilerConfig) -> Self {
        self.reconciler = config;
        self
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn DocumentRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Whether `message` is something the bot should answer.
    fn accepts(&self, bot: &BotIdentity, message: &InboundMessage) -> bool {
        if message.author_id == bot.user_id {
            return false;
        }
        if !self.access.permits(message.guild_id, message.channel_id) {
            debug!(
                channel_id = %message.channel_id,
                guild_id = ?message.guild_id,
                "message outside allowlist ignored"
            );
            return false;
        }
        message.mentions_bot || mentions(&message.content, bot.user_id)
    }

    /// Handle one inbound event end to end.
    ///
    /// Ignored events yield an empty outcome. Errors are returned only for
    /// generation and platform failures; persistence problems are logged.
    pub async fn handle(&self, bot: &BotIdentity, message: InboundMessage) -> Result<TurnOutcome> {
        debug!(phase = %TurnPhase::Idle, message_id = %message.message_id, "inbound message");
        if !self.accepts(bot, &message) {
            return Ok(TurnOutcome::default());
        }

        debug!(phase = %TurnPhase::AwaitingContext, message_id = %message.message_id, "resolving context");
        let mut prompt = strip_mentions(&message.content, bot.user_id);
        if prompt.is_empty() {
            prompt = self.settings.default_prompt.clone();
        }

        let mut state = None;
        if let Some(reference) = &message.reference {
            state = self.load_message(reference.target.message_id).await;
            if state.is_none() {
                let referenced = match &reference.content {
                    Some(text) => Some(text.clone()),
                    None => self
                        .history
                        .fetch_message_text(reference.target)
                        .await
                        .unwrap_or_else(|e| {
                            warn!(message_id = %reference.target.message_id, error = %e, "fetching referenced message failed");
                            None
                        }),
                };
                if let Some(text) = referenced.filter(|t| !t.trim().is_empty()) {
                    prompt = fold_reference(&prompt, &text);
                }
            }
        }

        if let Some(retriever) = &self.retriever {
            let documents = retriever.retrieve(&prompt, self.settings.document_results);
            if !documents.is_empty() {
                prompt = frame_with_documents(&prompt, &documents);
            }
        }

        if state.is_none() {
            state = self.load_channel(&message).await;
        }

        let (continuation, mut images) = match state {
            Some(s) => (Some(s.continuation), s.images),
            None => (None, Vec::new()),
        };
        images.extend(
            message
                .attachments
                .iter()
                .filter(|a| a.is_image())
                .map(|a| a.data.clone()),
        );

        let (model, sent_images) = match &self.settings.vision_model {
            Some(vision) if !images.is_empty() => (vision.clone(), images.clone()),
            _ => (self.settings.model.clone(), Vec::new()),
        };

        let origin = message.message_ref();
        let target = if self.settings.threads && message.channel_kind == ChannelKind::GuildText {
            TurnTarget::in_thread(origin, format!("{} Says", bot.name))
        } else {
            TurnTarget::reply_to(origin)
        };

        info!(
            phase = %TurnPhase::Generating,
            message_id = %message.message_id,
            channel_id = %message.channel_id,
            backend = self.backend.name(),
            %model,
            prompt_len = prompt.len(),
            resumed = continuation.is_some(),
            images = sent_images.len(),
            "generating reply"
        );
        let request = GenerationRequest::new(model, prompt)
            .with_continuation(continuation)
            .with_images(sent_images);

        let thinking = ThinkingIndicator::spawn(
            Arc::clone(&self.outbound),
            origin,
            self.settings.thinking_timeout,
        );
        let result = Reconciler::new(self.outbound.as_ref(), &self.reconciler, target)
            .with_thinking(thinking.token())
            .run(self.backend.generate(request))
            .await;
        thinking.finish().await;
        let outcome = result?;

        match (&outcome.continuation, outcome.last_message()) {
            (Some(continuation), Some(last)) => {
                let state = ConversationState::new(continuation.clone(), images);
                if let Err(e) = self
                    .sessions
                    .save(last.channel_id, last.message_id, &state)
                    .await
                {
                    warn!(
                        channel_id = %last.channel_id,
                        message_id = %last.message_id,
                        error = %e,
                        "persisting conversation state failed"
                    );
                }
            },
            _ => debug!(message_id = %message.message_id, "nothing to persist"),
        }

        info!(
            message_id = %message.message_id,
            messages = outcome.messages.len(),
            "reply complete"
        );
        Ok(outcome)
    }

    async fn load_message(&self, message_id: relay_common::MessageId) -> Option<ConversationState> {
        self.sessions
            .load_message(message_id)
            .await
            .unwrap_or_else(|e| {
                warn!(%message_id, error = %e, "loading reply state failed");
                None
            })
    }

    async fn load_channel(&self, message: &InboundMessage) -> Option<ConversationState> {
        self.sessions
            .load_channel(message.channel_id)
            .await
            .unwrap_or_else(|e| {
                warn!(channel_id = %message.channel_id, error = %e, "loading channel state failed");
                None
            })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            knowledge::JsonDocuments,
            testing::{Call, RecordingOutbound, ScriptedBackend, chunks},
        },
        relay_channels::{ChannelAttachment, MessageRef, ReplyReference},
        relay_common::{ChannelId, Continuation, GuildId, MessageId, UserId},
        relay_providers::{Error as BackendError, GenerationChunk},
        relay_sessions::MemoryStore,
    };

    const BOT: UserId = UserId(42);
    const USER: UserId = UserId(7);
    const CHANNEL: ChannelId = ChannelId(100);

    fn bot() -> BotIdentity {
        BotIdentity {
            user_id: BOT,
            name: "Llama Relay".into(),
        }
    }

    fn inbound(id: u64, content: &str) -> InboundMessage {
        InboundMessage {
            message_id: MessageId(id),
            channel_id: CHANNEL,
            guild_id: Some(GuildId(1)),
            channel_kind: ChannelKind::Thread,
            author_id: USER,
            content: content.into(),
            mentions_bot: content.contains("<@42>"),
            reference: None,
            attachments: vec![],
        }
    }

    fn replying_to(mut message: InboundMessage, target: u64) -> InboundMessage {
        message.reference = Some(ReplyReference {
            target: MessageRef::new(CHANNEL, MessageId(target)),
            content: None,
        });
        message
    }

    struct Harness {
        router: Router,
        backend: Arc<ScriptedBackend>,
        outbound: Arc<RecordingOutbound>,
        sessions: SessionStore,
    }

    fn harness(backend: ScriptedBackend, outbound: RecordingOutbound) -> Harness {
        let backend = Arc::new(backend);
        let outbound = Arc::new(outbound);
        let sessions = SessionStore::new(
            Arc::new(MemoryStore::new()),
            "llama-relay",
            Duration::from_secs(604_800),
        );
        let router = Router::new(
            backend.clone(),
            sessions.clone(),
            outbound.clone(),
            outbound.clone(),
        );
        Harness {
            router,
            backend,
            outbound,
            sessions,
        }
    }

    #[tokio::test]
    async fn hello_there_scenario_persists_continuation() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&["Hello"], " there", &[1, 2, 3])),
            RecordingOutbound::new(),
        );

        let outcome = h.router.handle(&bot(), inbound(1, "<@42>")).await.unwrap();

        let requests = h.backend.requests();
        assert_eq!(requests[0].prompt, "Hi!");
        assert_eq!(requests[0].model, "llama2");
        assert!(requests[0].continuation.is_none());
        assert_eq!(h.outbound.final_texts(), vec!["Hello there".to_string()]);

        let last = outcome.last_message_id().unwrap();
        let expected = Some(Continuation::from_context(vec![1, 2, 3]));
        let by_message = h.sessions.load_message(last).await.unwrap().unwrap();
        assert_eq!(Some(by_message.continuation), expected);
        let by_channel = h.sessions.load_channel(CHANNEL).await.unwrap().unwrap();
        assert_eq!(Some(by_channel.continuation), expected);
    }

    #[tokio::test]
    async fn ignores_own_unmentioned_and_disallowed_messages() {
        let h = harness(ScriptedBackend::new(), RecordingOutbound::new());
        let router = h.router.with_access(AccessPolicy::new(vec!["1".into()], vec!["100".into()]));

        let mut own = inbound(1, "<@42> hi");
        own.author_id = BOT;
        let unmentioned = inbound(2, "just chatting");
        let mut other_channel = inbound(3, "<@42> hi");
        other_channel.channel_id = ChannelId(999);

        for message in [own, unmentioned, other_channel] {
            let outcome = router.handle(&bot(), message).await.unwrap();
            assert!(outcome.messages.is_empty());
        }
        assert!(h.backend.requests().is_empty());
        assert!(h.outbound.calls().is_empty());
    }

    #[tokio::test]
    async fn nickname_mention_is_stripped() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "ok", &[1])),
            RecordingOutbound::new(),
        );
        let mut message = inbound(1, "<@!42> what is rust?");
        message.mentions_bot = false;
        h.router.handle(&bot(), message).await.unwrap();
        assert_eq!(h.backend.requests()[0].prompt, "what is rust?");
    }

    #[tokio::test]
    async fn reply_to_bot_message_resumes_its_state() {
        let h = harness(
            ScriptedBackend::new()
                .then(|| chunks(&[], "first", &[1, 2]))
                .then(|| chunks(&[], "second", &[1, 2, 3])),
            RecordingOutbound::new(),
        );

        let first = h.router.handle(&bot(), inbound(1, "<@42> hi")).await.unwrap();
        let bot_message = first.last_message_id().unwrap();

        let reply = replying_to(inbound(2, "<@42> and then?"), bot_message.get());
        h.router.handle(&bot(), reply).await.unwrap();

        let second = &h.backend.requests()[1];
        assert_eq!(second.prompt, "and then?");
        assert_eq!(
            second.continuation,
            Some(Continuation::from_context(vec![1, 2]))
        );
    }

    #[tokio::test]
    async fn reply_without_state_folds_referenced_text() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "ok", &[9])),
            RecordingOutbound::new().with_history(MessageId(50), "Rust 1.0 shipped in 2015."),
        );

        let reply = replying_to(inbound(2, "<@42> when?"), 50);
        h.router.handle(&bot(), reply).await.unwrap();

        let request = &h.backend.requests()[0];
        assert_eq!(
            request.prompt,
            "when?\nUse this to answer the question if it is relevant, otherwise ignore it:\nRust 1.0 shipped in 2015."
        );
        assert!(request.continuation.is_none());
    }

    #[tokio::test]
    async fn inline_reference_text_skips_history_fetch() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "ok", &[9])),
            RecordingOutbound::new(),
        );
        let mut reply = replying_to(inbound(2, "<@42> summarize"), 50);
        if let Some(reference) = reply.reference.as_mut() {
            reference.content = Some("inline text".into());
        }
        h.router.handle(&bot(), reply).await.unwrap();
        assert!(h.backend.requests()[0].prompt.ends_with("\ninline text"));
    }

    #[tokio::test]
    async fn reply_without_state_also_uses_channel_state() {
        let h = harness(
            ScriptedBackend::new()
                .then(|| chunks(&[], "first", &[4, 5]))
                .then(|| chunks(&[], "second", &[4, 5, 6])),
            RecordingOutbound::new().with_history(MessageId(50), "someone else's note"),
        );
        h.router.handle(&bot(), inbound(1, "<@42> hi")).await.unwrap();

        let reply = replying_to(inbound(2, "<@42> thoughts?"), 50);
        h.router.handle(&bot(), reply).await.unwrap();

        let second = &h.backend.requests()[1];
        assert!(second.prompt.ends_with("someone else's note"));
        assert_eq!(
            second.continuation,
            Some(Continuation::from_context(vec![4, 5]))
        );
    }

    #[tokio::test]
    async fn channel_fallback_round_trips_state() {
        let h = harness(
            ScriptedBackend::new()
                .then(|| chunks(&["a"], "b", &[10, 20]))
                .then(|| chunks(&[], "c", &[10, 20, 30])),
            RecordingOutbound::new(),
        );
        h.router.handle(&bot(), inbound(1, "<@42> one")).await.unwrap();
        h.router.handle(&bot(), inbound(2, "<@42> two")).await.unwrap();

        assert_eq!(
            h.backend.requests()[1].continuation,
            Some(Continuation::from_context(vec![10, 20]))
        );
    }

    #[tokio::test]
    async fn stream_error_keeps_partial_output_and_persists_nothing() {
        let h = harness(
            ScriptedBackend::new().then(|| {
                vec![
                    Ok(GenerationChunk::delta("x".repeat(40))),
                    Err(BackendError::Truncated),
                ]
            }),
            RecordingOutbound::new(),
        );

        let err = h
            .router
            .handle(&bot(), inbound(1, "<@42> go"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Backend(_)));
        assert_eq!(h.outbound.final_texts(), vec![format!("{}…", "x".repeat(40))]);
        assert!(h.sessions.load_channel(CHANNEL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_generation_persists_nothing() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "", &[1])),
            RecordingOutbound::new(),
        );
        let outcome = h.router.handle(&bot(), inbound(1, "<@42> hi")).await.unwrap();
        assert!(outcome.messages.is_empty());
        assert!(h.sessions.load_channel(CHANNEL).await.unwrap().is_none());
    }

    fn with_image(mut message: InboundMessage) -> InboundMessage {
        message.attachments = vec![
            ChannelAttachment {
                filename: "cat.png".into(),
                content_type: Some("image/png".into()),
                data: b"png-bytes".to_vec(),
            },
            ChannelAttachment {
                filename: "notes.txt".into(),
                content_type: Some("text/plain".into()),
                data: b"text".to_vec(),
            },
        ];
        message
    }

    #[tokio::test]
    async fn images_select_vision_model_and_carry_over() {
        let h = harness(
            ScriptedBackend::new()
                .then(|| chunks(&[], "a cat", &[1]))
                .then(|| chunks(&[], "still a cat", &[1, 2])),
            RecordingOutbound::new(),
        );
        let router = h.router.with_settings(RouterSettings {
            vision_model: Some("llava".into()),
            ..Default::default()
        });

        router
            .handle(&bot(), with_image(inbound(1, "<@42> what is this?")))
            .await
            .unwrap();
        router
            .handle(&bot(), inbound(2, "<@42> what color?"))
            .await
            .unwrap();

        let requests = h.backend.requests();
        assert_eq!(requests[0].model, "llava");
        assert_eq!(requests[0].images, vec![b"png-bytes".to_vec()]);
        assert_eq!(requests[1].model, "llava");
        assert_eq!(requests[1].images, vec![b"png-bytes".to_vec()]);
    }

    #[tokio::test]
    async fn images_are_not_sent_without_vision_model() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "ok", &[1])),
            RecordingOutbound::new(),
        );
        h.router
            .handle(&bot(), with_image(inbound(1, "<@42> look")))
            .await
            .unwrap();

        let request = &h.backend.requests()[0];
        assert_eq!(request.model, "llama2");
        assert!(request.images.is_empty());
        let stored = h.sessions.load_channel(CHANNEL).await.unwrap().unwrap();
        assert_eq!(stored.images, vec![b"png-bytes".to_vec()]);
    }

    #[tokio::test]
    async fn retrieved_documents_frame_the_prompt() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "ok", &[1])),
            RecordingOutbound::new(),
        );
        let docs = JsonDocuments::from_documents(["Ollama listens on port 11434".to_string()]);
        let router = h.router.with_retriever(Arc::new(docs));

        router
            .handle(&bot(), inbound(1, "<@42> which port does ollama use?"))
            .await
            .unwrap();

        let prompt = &h.backend.requests()[0].prompt;
        assert!(prompt.contains("<document>\nOllama listens on port 11434\n</document>"));
        assert!(prompt.ends_with("<user>\nwhich port does ollama use?\n</user>"));
    }

    #[tokio::test]
    async fn guild_text_channels_answer_in_a_thread() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "threaded", &[3])),
            RecordingOutbound::new(),
        );
        let mut message = inbound(1, "<@42> hi");
        message.channel_kind = ChannelKind::GuildText;

        let outcome = h.router.handle(&bot(), message).await.unwrap();

        let thread = RecordingOutbound::thread_id_for(MessageRef::new(CHANNEL, MessageId(1)));
        assert!(h.outbound.calls().contains(&Call::CreateThread {
            from: MessageRef::new(CHANNEL, MessageId(1)),
            name: "Llama Relay Says".into(),
            auto_archive_minutes: 60,
        }));
        assert_eq!(outcome.channel_id(), Some(thread));
        assert!(h.sessions.load_channel(thread).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn thinking_reaction_is_added_and_removed() {
        let h = harness(
            ScriptedBackend::new().then(|| chunks(&[], "done", &[1])),
            RecordingOutbound::new(),
        );
        h.router.handle(&bot(), inbound(1, "<@42> hi")).await.unwrap();

        let calls = h.outbound.calls();
        let origin = MessageRef::new(CHANNEL, MessageId(1));
        assert!(calls.contains(&Call::AddReaction {
            message: origin,
            emoji: "🤔".into(),
        }));
        assert_eq!(calls.last(), Some(&Call::RemoveReaction {
            message: origin,
            emoji: "🤔".into(),
        }));
    }
}
