use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use zoro_orchestrator::{ChatTurn, GenerationRequest, ProviderMetadata};

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::{ApiError, AppState};

const MAX_PROMPT_CHARS: usize = 8_000;
const MAX_HISTORY_TURNS: usize = 20;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GeminiChatRequest {
    pub message: String,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub system: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeminiChatResponse {
    pub success: bool,
    pub reply: String,
    pub model: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeminiStatusResponse {
    pub available: bool,
    pub model: String,
    #[schema(value_type = Vec<Object>)]
    pub providers: Vec<ProviderMetadata>,
}

pub fn create_gemini_routes() -> Router<AppState> {
    Router::new()
        .route("/api/gemini/chat", post(chat))
        .route("/api/gemini/status", get(status))
}

#[utoipa::path(
    post,
    path = "/api/gemini/chat",
    tag = "Gemini",
    request_body = GeminiChatRequest,
    responses(
        (status = 200, description = "Model reply", body = GeminiChatResponse),
        (status = 400, description = "Empty or oversized prompt", body = ErrorResponse),
        (status = 502, description = "Provider request failed", body = ErrorResponse),
        (status = 503, description = "No provider configured", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn chat(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(payload): Json<GeminiChatRequest>,
) -> Result<Json<GeminiChatResponse>, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }
    if message.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::bad_request(format!(
            "message exceeds {MAX_PROMPT_CHARS} characters"
        )));
    }

    let skip = payload.history.len().saturating_sub(MAX_HISTORY_TURNS);
    let history = payload.history.into_iter().skip(skip).collect();
    let mut request = GenerationRequest::new(message).with_history(history);
    if let Some(system) = payload.system.filter(|s| !s.trim().is_empty()) {
        request = request.with_system(system);
    }

    let orchestrator = state.orchestrator();
    let reply = orchestrator.generate(request).await?;
    info!(user = %user.public_id, chars = reply.len(), "gemini chat reply");

    Ok(Json(GeminiChatResponse {
        success: true,
        reply,
        model: orchestrator.active_model(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/gemini/status",
    tag = "Gemini",
    responses((status = 200, description = "Whether AI features are usable", body = GeminiStatusResponse))
)]
pub async fn status(State(state): State<AppState>) -> Json<GeminiStatusResponse> {
    let orchestrator = state.orchestrator();
    Json(GeminiStatusResponse {
        available: orchestrator.is_available(),
        model: orchestrator.active_model(),
        providers: orchestrator.providers(),
    })
}
