use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use sqlx::SqlitePool;
use tracing::{info, warn};
use zoro_chats::MessageCipher;
use zoro_config::AppConfig;
use zoro_database::initialize_database;
use zoro_orchestrator::Orchestrator;
use zoro_suggestions::{CacheBackend, MemoryCache, RedisCache, SuggestionService, TieredCache};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the gateway needs that is built once at startup.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub orchestrator: Arc<Orchestrator>,
    pub cipher: MessageCipher,
    pub suggestions: Arc<SuggestionService>,
    pub redis_conn: Option<ConnectionManager>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let orchestrator = Arc::new(
            Orchestrator::new(config)
                .bootstrap()
                .context("failed to bootstrap orchestrator")?,
        );
        info!(
            model = %orchestrator.active_model(),
            available = orchestrator.is_available(),
            "orchestrator ready"
        );

        let cipher = MessageCipher::from_config(&config.encryption)
            .context("failed to load message encryption key")?;

        let redis_conn = match config.cache.redis_url.as_deref() {
            Some(url) if !url.trim().is_empty() => connect_redis(url).await,
            _ => {
                info!("no redis url configured, suggestion cache is memory only");
                None
            }
        };

        let remote = redis_conn
            .clone()
            .map(|conn| Arc::new(RedisCache::new(conn)) as Arc<dyn CacheBackend>);
        let cache = TieredCache::new(
            MemoryCache::new(config.cache.memory_capacity),
            remote,
            Duration::from_secs(config.cache.ttl_seconds),
        );

        let mut suggestions =
            SuggestionService::new(config.suggestions.clone(), &config.cache, cache);
        if let Ok(generator) = orchestrator.default_provider() {
            suggestions = suggestions.with_generator(generator);
        }

        Ok(Self {
            db_pool,
            orchestrator,
            cipher,
            suggestions: Arc::new(suggestions),
            redis_conn,
        })
    }
}

/// Redis is optional; a bad url or unreachable server only costs the shared
/// cache tier.
async fn connect_redis(url: &str) -> Option<ConnectionManager> {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(error) => {
            warn!(%error, "invalid redis url, proceeding without redis");
            return None;
        }
    };

    match ConnectionManager::new(client).await {
        Ok(conn) => {
            info!("redis connection established");
            Some(conn)
        }
        Err(error) => {
            warn!(%error, "failed to connect to redis, proceeding without redis");
            None
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(?error, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(?error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
