use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngCore;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use zoro_config::AuthConfig;
use zoro_database::{DatabaseError, NewUser, User, UserRepository, UserRole};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound on session lifetime (100 years).
const MAX_SESSION_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    users: UserRepository,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("user not found")]
    UserNotFound,
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

impl From<sqlx::Error> for AuthError {
    fn from(error: sqlx::Error) -> Self {
        AuthError::Database(DatabaseError::Query(error))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let ttl_seconds = config.session_ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64;
        let session_ttl = Duration::seconds(ttl_seconds);

        Self {
            users: UserRepository::new(pool.clone()),
            pool,
            session_ttl,
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Registers a password account. The first account on an empty
    /// installation becomes an administrator.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let role = if self.users.count().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        };

        self.insert_user(email, password, display_name, role).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, AuthSession), AuthError> {
        let email = email.trim().to_lowercase();
        let Some((user, stored)) = self.users.find_credentials(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let stored_hash = PasswordHash::new(&stored)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.users.touch_last_seen(user.id).await?;
        let session = self.issue_session(user.id).await?;
        info!(user = %user.public_id, "user logged in");

        Ok((user, session))
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            debug!(user_id, "removed expired session");
            return Err(AuthError::SessionExpired);
        }

        let user = self.user_profile(user_id).await?;
        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::SessionNotFound);
        }
        Ok(())
    }

    /// Deletes every expired session and returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Creates an administrator, or promotes the account if the email is
    /// already registered.
    pub async fn create_admin(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        if let Some(existing) = self.users.find_by_email(&email).await? {
            let user = self.users.update_role(existing.id, UserRole::Admin).await?;
            info!(user = %user.public_id, "promoted existing user to admin");
            return Ok(user);
        }

        self.insert_user(email, password, None, UserRole::Admin).await
    }

    async fn insert_user(
        &self,
        email: String,
        password: &str,
        display_name: Option<&str>,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let password_hash = self.hash_password(password)?;
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);

        let user = self
            .users
            .create(&NewUser {
                email,
                display_name,
                password_hash,
                role,
            })
            .await
            .map_err(|error| match error {
                DatabaseError::Duplicate(_) => AuthError::UserExists,
                other => AuthError::Database(other),
            })?;

        Ok(user)
    }

    async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = self.generate_session_token();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(timestamp(now))
        .bind(timestamp(expires_at))
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Lowercases and trims the address and checks it has a local part and a
/// dotted domain.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::InvalidEmail);
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidEmail);
    }

    Ok(email)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}
