//! Configuration loading, validation and env substitution.
//!
//! Config files: `llama-relay.toml`, `llama-relay.yaml` or `llama-relay.json`,
//! searched in `./` then `~/.config/llama-relay/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all
//! string values, and the `OLLAMA_*` / `REDIS_*` environment overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, discover_and_load, find_config_file, load_config},
    schema::{
        DiscordConfig, KnowledgeConfig, OllamaConfig, RelayConfig, SessionBackend,
        SessionStoreConfig, StreamConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
