//! Shared application state handed to every handler.

use std::sync::Arc;

use zoro_auth::{AuthSession, Authenticator};
use zoro_chats::{
    AdminService, CodeSessionService, CoffeeBreakMatcher, EventService, GroupService,
    MessageCipher, MessageService, NotificationService, VaultService,
};
use zoro_config::AppConfig;
use zoro_database::{SqlitePool, User};
use zoro_orchestrator::Orchestrator;
use zoro_suggestions::SuggestionService;

use crate::websocket::{ConnectionRegistry, RoomRegistry};
use crate::ApiError;

#[derive(Clone)]
pub struct Services {
    pub messages: MessageService,
    pub groups: GroupService,
    pub vault: VaultService,
    pub notifications: NotificationService,
    pub code_sessions: CodeSessionService,
    pub events: EventService,
    pub admin: AdminService,
}

impl Services {
    pub fn new(pool: SqlitePool, cipher: MessageCipher) -> Self {
        Self {
            messages: MessageService::new(pool.clone(), cipher.clone()),
            groups: GroupService::new(pool.clone(), cipher),
            vault: VaultService::new(pool.clone()),
            notifications: NotificationService::new(pool.clone()),
            code_sessions: CodeSessionService::new(pool.clone()),
            events: EventService::new(pool.clone()),
            admin: AdminService::new(pool),
        }
    }
}

/// Socket bookkeeping per namespace.
#[derive(Clone, Default)]
pub struct Realtime {
    pub chat: ConnectionRegistry,
    pub code: ConnectionRegistry,
    pub code_rooms: RoomRegistry,
    pub coffee: ConnectionRegistry,
}

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    services: Services,
    suggestions: Arc<SuggestionService>,
    orchestrator: Arc<Orchestrator>,
    realtime: Realtime,
    coffee_break: Arc<CoffeeBreakMatcher>,
    cors_origins: Arc<[String]>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        pool: SqlitePool,
        cipher: MessageCipher,
        orchestrator: Arc<Orchestrator>,
        suggestions: Arc<SuggestionService>,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(pool.clone(), config.auth.clone()),
            services: Services::new(pool.clone(), cipher),
            pool,
            suggestions,
            orchestrator,
            realtime: Realtime::default(),
            coffee_break: Arc::new(CoffeeBreakMatcher::new(config.coffee_break.duration_seconds)),
            cors_origins: config.http.cors_origins.clone().into(),
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn suggestions(&self) -> &SuggestionService {
        &self.suggestions
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn realtime(&self) -> &Realtime {
        &self.realtime
    }

    pub fn coffee_break(&self) -> &CoffeeBreakMatcher {
        &self.coffee_break
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }
}
