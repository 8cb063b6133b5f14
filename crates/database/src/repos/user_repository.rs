//! User repository for database operations.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::{NewUser, UpdateProfile, User, UserRole};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const USER_COLUMNS: &str =
    "id, public_id, email, display_name, avatar_url, bio, role, last_seen_at, created_at, updated_at";

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Returns the stored password hash alongside the user for credential checks.
    pub async fn find_credentials(&self, email: &str) -> DatabaseResult<Option<(User, String)>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?;
        Ok(Some((user, hash)))
    }

    pub async fn create(&self, request: &NewUser) -> DatabaseResult<User> {
        let public_id = new_public_id();
        let now = now_timestamp();

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, display_name, role, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(request.role)
        .bind(&request.password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            let error = DatabaseError::from(error);
            if error.is_unique_violation() {
                DatabaseError::Duplicate(format!("user {}", request.email))
            } else {
                error
            }
        })?;

        let id = result.last_insert_rowid();
        info!(user_id = id, public_id = %public_id, role = request.role.as_str(), "created user");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("user {id}")))
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lists users ordered by creation, optionally filtered by a case-insensitive
    /// match on email or display name.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<User>> {
        let pattern = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{}%", term.to_lowercase()));

        let users = match pattern {
            Some(pattern) => {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE LOWER(email) LIKE ? OR LOWER(COALESCE(display_name, '')) LIKE ?
                     ORDER BY id ASC LIMIT ? OFFSET ?"
                ))
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(users)
    }

    pub async fn update_role(&self, id: i64, role: UserRole) -> DatabaseResult<User> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role)
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("user {id}")));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("user {id}")))
    }

    /// Applies the provided profile fields; `None` leaves a field untouched.
    pub async fn update_profile(&self, id: i64, update: &UpdateProfile) -> DatabaseResult<User> {
        let result = sqlx::query(
            "UPDATE users SET
                display_name = COALESCE(?, display_name),
                avatar_url = COALESCE(?, avatar_url),
                bio = COALESCE(?, bio),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&update.display_name)
        .bind(&update.avatar_url)
        .bind(&update.bio)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("user {id}")));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("user {id}")))
    }

    pub async fn touch_last_seen(&self, id: i64) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET last_seen_at = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("user {id}")));
        }

        info!(user_id = id, "deleted user");
        Ok(())
    }
}
