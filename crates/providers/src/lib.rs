//! Inference backend clients.
//!
//! A backend turns a prompt (plus optional continuation state and images)
//! into a lazy stream of [`GenerationChunk`]s. The stream ends with exactly
//! one `done` chunk carrying the new continuation, or with an error.

pub mod error;
pub mod model;
pub mod ndjson;
pub mod ollama;

pub use {
    error::{Error, Result},
    model::{ChunkStream, GenerationChunk, GenerationRequest, InferenceBackend},
    ollama::OllamaClient,
};
