//! REST API endpoints for the gateway

pub mod admin;
pub mod auth;
pub mod code;
pub mod events;
pub mod gemini;
pub mod groups;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod suggestions;
pub mod vault;

use axum::{routing::get, Router};

use crate::AppState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::create_auth_routes())
        .merge(messages::create_message_routes())
        .merge(groups::create_group_routes())
        .merge(vault::create_vault_routes())
        .merge(notifications::create_notification_routes())
        .merge(code::create_code_routes())
        .merge(events::create_event_routes())
        .merge(admin::create_admin_routes())
        .merge(suggestions::create_suggestion_routes())
        .merge(gemini::create_gemini_routes())
}
