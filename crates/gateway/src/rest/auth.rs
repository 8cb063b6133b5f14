use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use zoro_auth::AuthSession;
use zoro_database::User;

use crate::error::ErrorResponse;
use crate::extract::{expired_session_cookie, session_cookie, CurrentUser};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: String,
    #[schema(value_type = Object)]
    pub user: User,
}

impl SessionResponse {
    fn new(session: &AuthSession, user: User) -> Self {
        Self {
            success: true,
            token: session.token.clone(),
            expires_at: session.expires_at.to_rfc3339(),
            user,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

type SessionReply = ([(axum::http::HeaderName, String); 1], Json<SessionResponse>);

fn session_reply(session: &AuthSession, user: User) -> SessionReply {
    let max_age = (session.expires_at - Utc::now()).num_seconds();
    (
        [(SET_COOKIE, session_cookie(&session.token, max_age))],
        Json(SessionResponse::new(session, user)),
    )
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionResponse),
        (status = 400, description = "Invalid email, weak password or duplicate account", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, SessionReply), ApiError> {
    let authenticator = state.authenticator();
    let user = authenticator
        .register(&payload.email, &payload.password, payload.display_name.as_deref())
        .await?;
    let (user, session) = authenticator.login(&user.email, &payload.password).await?;

    info!(user = %user.public_id, role = user.role.as_str(), "account registered");
    Ok((StatusCode::CREATED, session_reply(&session, user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Wrong email or password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<SessionReply, ApiError> {
    let (user, session) = state
        .authenticator()
        .login(&payload.email, &payload.password)
        .await?;
    Ok(session_reply(&session, user))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session revoked", body = SuccessResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<([(axum::http::HeaderName, String); 1], Json<SuccessResponse>), ApiError> {
    state.authenticator().logout(&current.session.token).await?;
    Ok(([(SET_COOKIE, expired_session_cookie())], SuccessResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The signed-in user"),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}
