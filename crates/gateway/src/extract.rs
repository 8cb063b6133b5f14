use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use zoro_auth::AuthSession;
use zoro_database::User;

use crate::{ApiError, AppState};

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "token";

/// The authenticated caller, resolved from `Authorization: Bearer <token>`
/// or the `token` cookie.
pub struct CurrentUser {
    pub user: User,
    pub session: AuthSession,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)?
            .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
        let (user, session) = state.authenticate(&token).await?;
        Ok(Self { user, session })
    }
}

/// Returns the session token from the request, preferring the bearer header.
/// A malformed authorization header is an error rather than a fallback.
pub fn session_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ApiError::unauthorized("invalid authorization header"))?;
        let mut parts = value.split_whitespace();
        let scheme = parts.next().unwrap_or("");
        if !scheme.eq_ignore_ascii_case("Bearer") {
            return Err(ApiError::unauthorized("invalid authorization scheme"));
        }
        let token = parts.next().unwrap_or("");
        if token.is_empty() {
            return Err(ApiError::unauthorized("missing bearer token"));
        }
        return Ok(Some(token.to_string()));
    }

    Ok(cookie_token(headers))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value for a fresh session.
pub fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age_seconds.max(0)
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn bearer_token_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer TOKEN123"));
        assert_eq!(session_token(&headers).unwrap().as_deref(), Some("TOKEN123"));
    }

    #[test]
    fn empty_bearer_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        let error = session_token(&headers).unwrap_err();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert!(error.message.contains("missing bearer token"));
    }

    #[test]
    fn cookie_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=abc123"));
        assert_eq!(session_token(&headers).unwrap().as_deref(), Some("abc123"));

        let empty = HeaderMap::new();
        assert_eq!(session_token(&empty).unwrap(), None);
    }

    #[test]
    fn cookie_helpers_format_attributes() {
        assert_eq!(
            session_cookie("abc", 60),
            "token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(expired_session_cookie().ends_with("Max-Age=0"));
    }
}
