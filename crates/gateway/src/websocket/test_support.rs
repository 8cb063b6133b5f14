//! Socket handler fixtures: an `AppState` over a throwaway SQLite file and
//! helpers for reading what a registered outbox received.

use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use zoro_chats::MessageCipher;
use zoro_config::AppConfig;
use zoro_database::{initialize_database, User};
use zoro_orchestrator::Orchestrator;
use zoro_suggestions::{SuggestionService, TieredCache};

use super::{ConnectionId, ConnectionRegistry, Outbox};
use crate::AppState;

pub(crate) struct SocketFixture {
    _dir: TempDir,
    pub state: AppState,
}

impl SocketFixture {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("sockets.db").display());
        config.database.max_connections = 4;
        adjust(&mut config);

        let pool = initialize_database(&config.database)
            .await
            .expect("database");
        let suggestions = Arc::new(SuggestionService::new(
            config.suggestions.clone(),
            &config.cache,
            TieredCache::memory_only(16),
        ));
        let state = AppState::new(
            &config,
            pool,
            MessageCipher::from_secret("socket-test-secret"),
            Arc::new(Orchestrator::new(&config)),
            suggestions,
        );

        Self { _dir: dir, state }
    }

    pub async fn user(&self, name: &str) -> User {
        self.state
            .authenticator()
            .register(&format!("{name}@example.com"), "correct-horse", Some(name))
            .await
            .expect("register user")
    }
}

/// One open socket as the handlers see it.
pub(crate) struct TestSocket {
    pub outbox: Outbox,
    pub connection: ConnectionId,
    rx: UnboundedReceiver<String>,
}

impl TestSocket {
    pub async fn open(registry: &ConnectionRegistry, user: &User) -> Self {
        let (outbox, rx) = Outbox::channel();
        let (connection, _) = registry
            .register(user.id, &user.public_id, outbox.clone())
            .await;
        Self {
            outbox,
            connection,
            rx,
        }
    }

    /// Every event queued so far, parsed.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            events.push(serde_json::from_str(&text).expect("socket event is json"));
        }
        events
    }

    pub fn types(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .map(|event| event["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}
