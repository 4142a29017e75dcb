//! Recording fakes for the platform and the inference backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    async_trait::async_trait,
    relay_channels::{ChannelHistory, ChannelOutbound, Error as ChannelError, MessageRef},
    relay_common::{ChannelId, Continuation, MessageId},
    relay_providers::{ChunkStream, GenerationChunk, GenerationRequest, InferenceBackend},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        channel_id: ChannelId,
        text: String,
        reply_to: Option<MessageId>,
    },
    Edit {
        message: MessageRef,
        text: String,
    },
    AddReaction {
        message: MessageRef,
        emoji: String,
    },
    RemoveReaction {
        message: MessageRef,
        emoji: String,
    },
    CreateThread {
        from: MessageRef,
        name: String,
        auto_archive_minutes: u16,
    },
    Typing {
        channel_id: ChannelId,
    },
}

const FIRST_MESSAGE_ID: u64 = 1000;

/// Records every platform call; sent messages get ids from 1000 upwards.
pub struct RecordingOutbound {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    fail_sends: bool,
    history: Mutex<HashMap<MessageId, String>>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(FIRST_MESSAGE_ID),
            fail_sends: false,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn with_history(self, message_id: MessageId, text: &str) -> Self {
        self.history
            .lock()
            .unwrap()
            .insert(message_id, text.to_string());
        self
    }

    pub fn thread_id_for(origin: MessageRef) -> ChannelId {
        ChannelId(origin.message_id.get() + 500_000)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Last text shown in each sent message, in send order.
    pub fn final_texts(&self) -> Vec<String> {
        let mut order = Vec::new();
        let mut texts: HashMap<MessageId, String> = HashMap::new();
        let mut ids = FIRST_MESSAGE_ID;
        for call in self.calls() {
            match call {
                Call::Send { text, .. } => {
                    let id = MessageId(ids);
                    ids += 1;
                    order.push(id);
                    texts.insert(id, text);
                },
                Call::Edit { message, text } => {
                    texts.insert(message.message_id, text);
                },
                _ => {},
            }
        }
        order.into_iter().filter_map(|id| texts.remove(&id)).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChannelOutbound for RecordingOutbound {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> relay_channels::Result<MessageRef> {
        if self.fail_sends {
            return Err(ChannelError::unavailable("send rejected"));
        }
        self.record(Call::Send {
            channel_id,
            text: text.to_string(),
            reply_to,
        });
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(MessageRef::new(channel_id, id))
    }

    async fn edit_message(&self, message: MessageRef, text: &str) -> relay_channels::Result<()> {
        self.record(Call::Edit {
            message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(&self, message: MessageRef, emoji: &str) -> relay_channels::Result<()> {
        self.record(Call::AddReaction {
            message,
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        message: MessageRef,
        emoji: &str,
    ) -> relay_channels::Result<()> {
        self.record(Call::RemoveReaction {
            message,
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn create_thread(
        &self,
        from: MessageRef,
        name: &str,
        auto_archive_minutes: u16,
    ) -> relay_channels::Result<ChannelId> {
        self.record(Call::CreateThread {
            from,
            name: name.to_string(),
            auto_archive_minutes,
        });
        Ok(Self::thread_id_for(from))
    }

    async fn send_typing(&self, channel_id: ChannelId) -> relay_channels::Result<()> {
        self.record(Call::Typing { channel_id });
        Ok(())
    }
}

#[async_trait]
impl ChannelHistory for RecordingOutbound {
    async fn fetch_message_text(
        &self,
        message: MessageRef,
    ) -> relay_channels::Result<Option<String>> {
        Ok(self.history.lock().unwrap().get(&message.message_id).cloned())
    }
}

/// `deltas` as non-terminal chunks followed by a terminal chunk.
pub fn chunks(
    deltas: &[&str],
    last: &str,
    context: &[i64],
) -> Vec<relay_providers::Result<GenerationChunk>> {
    let mut items: Vec<_> = deltas
        .iter()
        .map(|d| Ok(GenerationChunk::delta(*d)))
        .collect();
    items.push(Ok(GenerationChunk::done(
        last,
        Continuation::from_context(context.to_vec()),
    )));
    items
}

type Script = Box<dyn FnOnce() -> Vec<relay_providers::Result<GenerationChunk>> + Send>;

/// Replays one scripted stream per `generate` call and keeps the requests.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then(
        self,
        script: impl FnOnce() -> Vec<relay_providers::Result<GenerationChunk>> + Send + 'static,
    ) -> Self {
        self.scripts.lock().unwrap().push_back(Box::new(script));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: GenerationRequest) -> ChunkStream<'_> {
        self.requests.lock().unwrap().push(request);
        let items = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .map(|script| script())
            .unwrap_or_default();
        Box::pin(futures::stream::iter(items))
    }
}
