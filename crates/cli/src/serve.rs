use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::Context,
    relay_chat::{JsonDocuments, Router},
    relay_config::{RelayConfig, SessionBackend},
    relay_discord::{DiscordOutbound, RelayHandler},
    relay_providers::OllamaClient,
    relay_sessions::{KeyValueStore, MemoryStore, RedisStore, SessionStore, SqliteStore},
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
};

/// How often expired rows are swept from the SQLite store.
const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

async fn open_store(config: &RelayConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store = &config.session_store;
    let kv: Arc<dyn KeyValueStore> = match store.backend {
        SessionBackend::Redis => {
            let url = store.redis_url();
            info!(host = %store.host, port = store.port, "using redis session store");
            Arc::new(
                RedisStore::connect(&url)
                    .await
                    .with_context(|| format!("connecting to redis at {}:{}", store.host, store.port))?,
            )
        },
        SessionBackend::Sqlite => {
            info!(path = %store.path, "using sqlite session store");
            let sqlite = Arc::new(
                SqliteStore::open(&store.path)
                    .await
                    .with_context(|| format!("opening {}", store.path))?,
            );
            let sweeper = Arc::clone(&sqlite);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PURGE_INTERVAL);
                loop {
                    interval.tick().await;
                    match sweeper.purge_expired().await {
                        Ok(n) if n > 0 => debug!(removed = n, "purged expired session rows"),
                        Ok(_) => {},
                        Err(e) => warn!(error = %e, "session purge failed"),
                    }
                }
            });
            sqlite
        },
        SessionBackend::Memory => {
            warn!("using in-memory session store; conversations are lost on restart");
            Arc::new(MemoryStore::new())
        },
    };
    Ok(kv)
}

/// Wire every component together and serve Discord events until the
/// gateway connection ends or the process is interrupted.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let kv = open_store(&config).await?;
    let sessions = SessionStore::new(
        kv,
        config.session_store.key_prefix.clone(),
        Duration::from_secs(config.session_store.ttl_secs),
    );

    let base_url = config.ollama.base_url();
    let backend = Arc::new(OllamaClient::new(&base_url)?);
    info!(
        base_url,
        model = %config.ollama.model,
        vision_model = ?config.ollama.vision_model,
        "ollama backend configured"
    );

    let token = config.discord.token.expose_secret().clone();
    let discord = Arc::new(DiscordOutbound::from_token(&token));

    let mut router = Router::new(backend, sessions, discord.clone(), discord).configured(&config);

    if let Some(dir) = &config.knowledge.data_dir {
        let documents = JsonDocuments::load_dir(Path::new(dir))?;
        info!(%documents, "document retrieval enabled");
        router = router.with_retriever(Arc::new(documents));
    }

    let handler = RelayHandler::new(Arc::new(router), config.discord.presence.clone());

    tokio::select! {
        result = relay_discord::run(&token, handler) => {
            result?;
            info!("discord gateway closed");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        },
    }
    Ok(())
}
