//! Conversation state persistence.
//!
//! State is written to a key-value engine (Redis, SQLite or memory) under
//! namespaced keys with a fixed expiry:
//!
//! - `{prefix}:channel:{channel_id}`: the most recent completed turn in a channel
//! - `{prefix}:message:{message_id}`: the turn completed by a bot message
//! - `{prefix}:images:{message_id}`: images carried by that turn

pub mod error;
pub mod kv;
pub mod redis_store;
pub mod sqlite;
pub mod state;
pub mod store;

pub use {
    error::{Error, Result},
    kv::{KeyValueStore, MemoryStore},
    redis_store::RedisStore,
    sqlite::SqliteStore,
    state::ConversationState,
    store::SessionStore,
};
