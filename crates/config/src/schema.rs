/// Config schema types (ollama, session store, streaming, discord, knowledge).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Seven days, the retention window for conversation state.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 7;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub ollama: OllamaConfig,
    pub session_store: SessionStoreConfig,
    pub stream: StreamConfig,
    pub discord: DiscordConfig,
    pub knowledge: KnowledgeConfig,
}

/// Inference backend connection and model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// `http` or `https`.
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Model used for text-only turns.
    pub model: String,
    /// Model used when the turn carries images. Images are not sent to the
    /// backend when this is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
}

impl OllamaConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            scheme: "http".into(),
            host: "127.0.0.1".into(),
            port: 11434,
            model: "llama2".into(),
            vision_model: None,
        }
    }
}

/// Which key-value engine backs the session store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Redis,
    Sqlite,
    /// Process-local, lost on restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStoreConfig {
    pub backend: SessionBackend,
    /// Redis host.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// SQLite database file, used by the `sqlite` backend.
    pub path: String,
    /// Namespace prepended to every key.
    pub key_prefix: String,
    /// Expiry applied to every write.
    pub ttl_secs: u64,
}

impl SessionStoreConfig {
    #[must_use]
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/0", self.host, self.port)
    }
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            host: "127.0.0.1".into(),
            port: 6379,
            path: "llama-relay.db".into(),
            key_prefix: "llama-relay".into(),
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

/// Streaming reconciliation knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Flush once this many characters are buffered.
    pub buffer_size: usize,
    /// Flush at least this often while tokens are arriving (ms).
    pub flush_interval_ms: u64,
    /// Hard per-message limit enforced by the chat platform.
    pub max_message_len: usize,
    /// Suffix shown on messages that are still being written.
    pub marker: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            flush_interval_ms: 1000,
            max_message_len: 2000,
            marker: "…".into(),
        }
    }
}

/// Discord bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Normally supplied through `DISCORD_TOKEN`.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Open a thread from the user's message when replying in a guild text
    /// channel.
    pub threads: bool,

    /// Guild ID allowlist (empty = all guilds).
    pub guild_allowlist: Vec<String>,

    /// Channel ID allowlist (empty = all channels).
    pub channel_allowlist: Vec<String>,

    /// Ceiling for the "thinking" reaction and typing indicator.
    pub thinking_timeout_secs: u64,

    /// Prompt used when the mention carries no text.
    pub default_prompt: String,

    /// Custom status shown on the bot's profile.
    pub presence: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("threads", &self.threads)
            .field("guild_allowlist", &self.guild_allowlist)
            .field("channel_allowlist", &self.channel_allowlist)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            threads: true,
            guild_allowlist: Vec::new(),
            channel_allowlist: Vec::new(),
            thinking_timeout_secs: 999,
            default_prompt: "Hi!".into(),
            presence: "Ask me anything!".into(),
        }
    }
}

/// Local documents folded into prompts as reference material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory of `*.json` files, each a JSON array of strings. Retrieval
    /// is disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Number of documents retrieved per turn.
    pub results: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            results: 2,
        }
    }
}
