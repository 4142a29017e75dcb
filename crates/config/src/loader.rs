use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::RelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "llama-relay.toml",
    "llama-relay.yaml",
    "llama-relay.yml",
    "llama-relay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RelayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./llama-relay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/llama-relay/llama-relay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelayConfig::default()` if no config file is found or the file
/// fails to parse.
pub fn discover_and_load() -> RelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RelayConfig::default()
}

/// First existing config file in the search order, if any.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dirs = directories::ProjectDirs::from("", "", "llama-relay")?;
    let config_dir = dirs.config_dir();
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Apply the environment variables recognised by the bridge on top of a
/// loaded config.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("OLLAMA_SCHEME") {
        config.ollama.scheme = v;
    }
    if let Some(v) = lookup("OLLAMA_HOST") {
        config.ollama.host = v;
    }
    if let Some(v) = lookup("OLLAMA_PORT") {
        match v.parse() {
            Ok(port) => config.ollama.port = port,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid OLLAMA_PORT"),
        }
    }
    if let Some(v) = lookup("OLLAMA_MODEL") {
        config.ollama.model = v;
    }
    if let Some(v) = lookup("OLLAMA_VISION_MODEL") {
        config.ollama.vision_model = Some(v).filter(|m| !m.is_empty());
    }
    if let Some(v) = lookup("REDIS_HOST") {
        config.session_store.host = v;
    }
    if let Some(v) = lookup("REDIS_PORT") {
        match v.parse() {
            Ok(port) => config.session_store.port = port,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid REDIS_PORT"),
        }
    }
    if let Some(v) = lookup("DISCORD_TOKEN") {
        config.discord.token = Secret::new(v);
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
