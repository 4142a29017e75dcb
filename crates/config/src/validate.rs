//! Semantic validation of a loaded configuration.

use secrecy::ExposeSecret;

use crate::schema::{RelayConfig, SessionBackend};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "stream.buffer_size".
    pub path: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check values that deserialize fine but cannot work at runtime.
#[must_use]
pub fn validate(config: &RelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !matches!(config.ollama.scheme.as_str(), "http" | "https") {
        result.push(
            Severity::Error,
            "ollama.scheme",
            format!("expected http or https, got {:?}", config.ollama.scheme),
        );
    }
    if config.ollama.port == 0 {
        result.push(Severity::Error, "ollama.port", "port must be non-zero");
    }
    if config.ollama.model.trim().is_empty() {
        result.push(Severity::Error, "ollama.model", "model must be set");
    }

    if config.stream.buffer_size == 0 {
        result.push(
            Severity::Error,
            "stream.buffer_size",
            "buffer size must be at least 1",
        );
    }
    let marker_len = config.stream.marker.chars().count();
    if config.stream.max_message_len <= marker_len {
        result.push(
            Severity::Error,
            "stream.max_message_len",
            "message limit must leave room for the continuation marker",
        );
    }
    if config.stream.flush_interval_ms == 0 {
        result.push(
            Severity::Warning,
            "stream.flush_interval_ms",
            "a zero interval flushes on every chunk",
        );
    }

    match config.session_store.backend {
        SessionBackend::Redis if config.session_store.port == 0 => {
            result.push(Severity::Error, "session_store.port", "port must be non-zero");
        },
        SessionBackend::Sqlite if config.session_store.path.trim().is_empty() => {
            result.push(
                Severity::Error,
                "session_store.path",
                "sqlite backend needs a database path",
            );
        },
        SessionBackend::Memory => {
            result.push(
                Severity::Warning,
                "session_store.backend",
                "conversation state will not survive a restart",
            );
        },
        _ => {},
    }
    if config.session_store.ttl_secs == 0 {
        result.push(
            Severity::Error,
            "session_store.ttl_secs",
            "expiry must be at least one second",
        );
    }

    if config.discord.token.expose_secret().is_empty() {
        result.push(
            Severity::Error,
            "discord.token",
            "no bot token, set DISCORD_TOKEN",
        );
    }

    result
}
