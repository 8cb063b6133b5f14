use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;
use zoro_database::UserRepository;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: bool,
    pub ai_available: bool,
    pub online_users: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match UserRepository::new(state.db_pool().clone()).count().await {
        Ok(_) => true,
        Err(err) => {
            warn!(error = %err, "health check: database unreachable");
            false
        }
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        database,
        ai_available: state.orchestrator().is_available(),
        online_users: state.realtime().chat.online_users().await.len(),
    })
}
