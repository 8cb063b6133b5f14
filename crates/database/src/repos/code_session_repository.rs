//! Repository for collaborative code sessions.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::{CodeSession, NewCodeSession};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const SESSION_SELECT: &str = "SELECT c.id, c.public_id, c.owner_id, u.public_id AS owner_public_id,
        c.title, c.language, c.content, c.created_at, c.updated_at
     FROM code_sessions c
     JOIN users u ON u.id = c.owner_id";

#[derive(Clone)]
pub struct CodeSessionRepository {
    pool: SqlitePool,
}

impl CodeSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the session with its owner as the first participant.
    pub async fn create(&self, request: &NewCodeSession) -> DatabaseResult<CodeSession> {
        let public_id = new_public_id();
        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO code_sessions (public_id, owner_id, title, language, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.owner_id)
        .bind(&request.title)
        .bind(&request.language)
        .bind(&request.content)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO code_session_participants (session_id, user_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(request.owner_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(session_id = id, owner_id = request.owner_id, "created code session");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("code session {id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<CodeSession>> {
        let session = sqlx::query_as::<_, CodeSession>(&format!("{SESSION_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<CodeSession>> {
        let session =
            sqlx::query_as::<_, CodeSession>(&format!("{SESSION_SELECT} WHERE c.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(session)
    }

    /// Sessions the user participates in, most recently edited first.
    pub async fn list_for_user(&self, user_id: i64) -> DatabaseResult<Vec<CodeSession>> {
        let sessions = sqlx::query_as::<_, CodeSession>(&format!(
            "{SESSION_SELECT}
             WHERE c.id IN (SELECT session_id FROM code_session_participants WHERE user_id = ?)
             ORDER BY c.updated_at DESC, c.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn add_participant(&self, session_id: i64, user_id: i64) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO code_session_participants (session_id, user_id, joined_at)
             VALUES (?, ?, ?)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_participant(&self, session_id: i64, user_id: i64) -> DatabaseResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM code_session_participants WHERE session_id = ? AND user_id = ?",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Replaces the buffer and, when given, the language.
    pub async fn update_content(
        &self,
        id: i64,
        content: &str,
        language: Option<&str>,
    ) -> DatabaseResult<CodeSession> {
        let result = sqlx::query(
            "UPDATE code_sessions SET content = ?, language = COALESCE(?, language), updated_at = ?
             WHERE id = ?",
        )
        .bind(content)
        .bind(language)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("code session {id}")));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("code session {id}")))
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM code_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("code session {id}")));
        }
        Ok(())
    }
}
