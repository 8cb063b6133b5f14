use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use zoro_database::Event;

use crate::extract::CurrentUser;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct UpcomingQuery {
    pub limit: Option<i64>,
}

pub fn create_event_routes() -> Router<AppState> {
    Router::new().route("/api/events", get(upcoming_events))
}

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    params(UpcomingQuery),
    responses((status = 200, description = "Events that have not started yet, soonest first")),
    security(("bearerAuth" = []))
)]
pub async fn upcoming_events(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.services().events.upcoming(query.limit).await?))
}
