//! Reply suggestions for the composer: the heuristic pipeline under
//! `/api/message-suggestions` and the AI-first variant under `/api/ai-suggestions`.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;
use zoro_suggestions::{
    ImprovedMessage, SuggestionRequest, SuggestionResponse, SuggestionStats, Tone,
};

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImproveRequest {
    pub text: String,
    /// `friendly`, `formal` or `concise`; defaults to friendly.
    #[serde(default)]
    pub tone: Option<String>,
}

pub fn create_suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/api/message-suggestions", post(suggest))
        .route("/api/message-suggestions/stats", get(stats))
        .route("/api/ai-suggestions", post(suggest_ai))
        .route("/api/ai-suggestions/improve", post(improve))
}

fn scoped(mut request: SuggestionRequest, current: &CurrentUser) -> SuggestionRequest {
    request.user_id = Some(current.user.public_id.clone());
    request
}

#[utoipa::path(
    post,
    path = "/api/message-suggestions",
    tag = "Suggestions",
    responses(
        (status = 200, description = "Reply suggestions with their source and message analysis"),
        (status = 400, description = "Empty or oversized message", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn suggest(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let request = scoped(payload, &current);
    let response = state.suggestions().suggest(&request).await?;
    debug!(
        user = %current.user.public_id,
        source = response.source.as_str(),
        count = response.suggestions.len(),
        "suggestions served"
    );
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/message-suggestions/stats",
    tag = "Suggestions",
    responses((status = 200, description = "Pipeline counters and cache state")),
    security(("bearerAuth" = []))
)]
pub async fn stats(State(state): State<AppState>, _user: CurrentUser) -> Json<SuggestionStats> {
    Json(state.suggestions().stats())
}

#[utoipa::path(
    post,
    path = "/api/ai-suggestions",
    tag = "Suggestions",
    responses(
        (status = 200, description = "Suggestions from the model, or the heuristic pipeline when it is unavailable"),
        (status = 400, description = "Empty or oversized message", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn suggest_ai(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let request = scoped(payload, &current);
    Ok(Json(state.suggestions().suggest_ai(&request).await?))
}

#[utoipa::path(
    post,
    path = "/api/ai-suggestions/improve",
    tag = "Suggestions",
    request_body = ImproveRequest,
    responses(
        (status = 200, description = "Rewritten message"),
        (status = 400, description = "Empty text or unknown tone", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn improve(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<ImproveRequest>,
) -> Result<Json<ImprovedMessage>, ApiError> {
    let tone = match payload.tone.as_deref() {
        Some(tone) => tone.parse::<Tone>()?,
        None => Tone::default(),
    };
    Ok(Json(state.suggestions().improve(&payload.text, tone).await?))
}
