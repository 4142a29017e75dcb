use std::pin::Pin;

use {relay_common::Continuation, tokio_stream::Stream};

use crate::error::Result;

/// One generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// State returned by the previous turn, if the conversation continues.
    pub continuation: Option<Continuation>,
    /// Raw image bytes for multimodal models. Empty for text-only turns.
    pub images: Vec<Vec<u8>>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_continuation(mut self, continuation: Option<Continuation>) -> Self {
        self.continuation = continuation.filter(|c| !c.is_empty());
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<Vec<u8>>) -> Self {
        self.images = images;
        self
    }
}

/// One incremental unit of generated text.
///
/// `continuation` is present iff `done` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationChunk {
    pub delta: String,
    pub done: bool,
    pub continuation: Option<Continuation>,
}

impl GenerationChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: text.into(),
            done: false,
            continuation: None,
        }
    }

    pub fn done(text: impl Into<String>, continuation: Continuation) -> Self {
        Self {
            delta: text.into(),
            done: true,
            continuation: Some(continuation),
        }
    }
}

/// Lazy, finite, non-restartable chunk sequence. An `Err` item is always
/// the last one.
pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<GenerationChunk>> + Send + 'a>>;

/// A text-generation backend.
pub trait InferenceBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Start generating. Nothing is sent until the stream is first polled.
    fn generate(&self, request: GenerationRequest) -> ChunkStream<'_>;
}
