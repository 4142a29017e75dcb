use {clap::Args, relay_config::RelayConfig};

/// Command-line overrides, applied after the config file and environment.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Ollama URL scheme.
    #[arg(long, global = true, env = "OLLAMA_SCHEME", value_parser = ["http", "https"])]
    pub ollama_scheme: Option<String>,

    /// Ollama host name or address.
    #[arg(long, global = true, env = "OLLAMA_HOST")]
    pub ollama_host: Option<String>,

    /// Ollama port.
    #[arg(long, global = true, env = "OLLAMA_PORT")]
    pub ollama_port: Option<u16>,

    /// Model used for text-only turns.
    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    pub ollama_model: Option<String>,

    /// Redis host for conversation state.
    #[arg(long, global = true, env = "REDIS_HOST")]
    pub redis_host: Option<String>,

    /// Redis port for conversation state.
    #[arg(long, global = true, env = "REDIS_PORT")]
    pub redis_port: Option<u16>,

    /// Characters buffered before a message edit.
    #[arg(long, global = true)]
    pub buffer_size: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(v) = &self.ollama_scheme {
            config.ollama.scheme = v.clone();
        }
        if let Some(v) = &self.ollama_host {
            config.ollama.host = v.clone();
        }
        if let Some(v) = self.ollama_port {
            config.ollama.port = v;
        }
        if let Some(v) = &self.ollama_model {
            config.ollama.model = v.clone();
        }
        if let Some(v) = &self.redis_host {
            config.session_store.host = v.clone();
        }
        if let Some(v) = self.redis_port {
            config.session_store.port = v;
        }
        if let Some(v) = self.buffer_size {
            config.stream.buffer_size = v;
        }
    }
}
