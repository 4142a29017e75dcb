//! Redis-backed key-value store.

use std::time::Duration;

use {
    async_trait::async_trait,
    redis::{AsyncCommands, aio::ConnectionManager},
    tracing::debug,
};

use crate::{error::Result, kv::KeyValueStore};

/// Key-value store over a reconnecting Redis connection.
///
/// `ConnectionManager` is cheap to clone; each call works on its own clone
/// so concurrent turns never wait on each other.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        debug!(url, "connected to redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        // Redis rejects EX 0; round sub-second expiries up.
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs).await?;
        Ok(())
    }
}
