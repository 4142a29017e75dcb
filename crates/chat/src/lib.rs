//! The relay core.
//!
//! [`Router`] is the per-event entry point. It resolves prior conversation
//! state, asks the inference backend for a reply and hands the chunk stream
//! to a [`Reconciler`], which keeps the chat messages within the platform
//! limit while the reply streams in.

pub mod error;
pub mod knowledge;
pub mod prompt;
pub mod reconciler;
pub mod router;
pub mod thinking;
pub mod turn;

#[cfg(test)]
mod testing;

pub use {
    error::{Error, Result},
    knowledge::{DocumentRetriever, JsonDocuments},
    reconciler::{Reconciler, ReconcilerConfig},
    router::{Router, RouterSettings},
    thinking::ThinkingIndicator,
    turn::{TurnOutcome, TurnPhase, TurnTarget},
};
