use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;
use zoro_auth::AuthError;
use zoro_chats::ChatError;
use zoro_orchestrator::OrchestratorError;
use zoro_suggestions::SuggestionError;

/// Body of every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let status = match error {
            AuthError::SessionNotFound | AuthError::SessionExpired | AuthError::InvalidSession => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InvalidCredentials
            | AuthError::UserExists
            | AuthError::InvalidEmail
            | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Database(_) | AuthError::PasswordHash(_) => {
                error!(error = ?error, "auth error");
                return Self::internal_server_error("authentication backend failure");
            }
        };
        Self::new(status, error.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        let status = match &error {
            ChatError::NotFound { .. } => StatusCode::NOT_FOUND,
            ChatError::AccessDenied { .. } | ChatError::PermissionDenied { .. } => {
                StatusCode::FORBIDDEN
            }
            ChatError::Validation { .. } => StatusCode::BAD_REQUEST,
            ChatError::Conflict { .. } => StatusCode::CONFLICT,
            ChatError::Database(_) | ChatError::Cipher(_) => {
                error!(error = ?error, "chat service error");
                return Self::internal_server_error("internal server error");
            }
        };
        Self::new(status, error.to_string())
    }
}

impl From<SuggestionError> for ApiError {
    fn from(error: SuggestionError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::ProviderIndexMissing
            | OrchestratorError::GeminiApiKeyMissing
            | OrchestratorError::ProviderUnavailable
            | OrchestratorError::ProviderNotFound(_) => {
                warn!(error = %error, "AI provider unavailable");
                Self::service_unavailable("AI service is not configured")
            }
            OrchestratorError::InvalidRequest(message) => Self::bad_request(message),
            other => {
                error!(error = ?other, "AI provider error");
                Self::new(StatusCode::BAD_GATEWAY, "AI service request failed")
            }
        }
    }
}
