//! Repository for direct message data access operations.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::{ConversationSummary, DirectMessage, NewDirectMessage};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const MESSAGE_SELECT: &str = "SELECT m.id, m.public_id, m.sender_id, s.public_id AS sender_public_id,
        m.recipient_id, r.public_id AS recipient_public_id, m.content, m.message_type,
        m.read_at, m.created_at
     FROM messages m
     JOIN users s ON s.id = m.sender_id
     JOIN users r ON r.id = m.recipient_id";

/// Repository for direct message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &NewDirectMessage) -> DatabaseResult<DirectMessage> {
        let public_id = new_public_id();

        let result = sqlx::query(
            "INSERT INTO messages (public_id, sender_id, recipient_id, content, message_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.sender_id)
        .bind(request.recipient_id)
        .bind(&request.content)
        .bind(request.message_type)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            message_id = id,
            sender_id = request.sender_id,
            recipient_id = request.recipient_id,
            "stored direct message"
        );

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("message {id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<DirectMessage>> {
        let message =
            sqlx::query_as::<_, DirectMessage>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(message)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<DirectMessage>> {
        let message =
            sqlx::query_as::<_, DirectMessage>(&format!("{MESSAGE_SELECT} WHERE m.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(message)
    }

    /// Messages exchanged between two users, newest first. `before` pages
    /// backwards from a message id.
    pub async fn conversation(
        &self,
        user_a: i64,
        user_b: i64,
        limit: i64,
        before: Option<i64>,
    ) -> DatabaseResult<Vec<DirectMessage>> {
        let messages = sqlx::query_as::<_, DirectMessage>(&format!(
            "{MESSAGE_SELECT}
             WHERE ((m.sender_id = ? AND m.recipient_id = ?) OR (m.sender_id = ? AND m.recipient_id = ?))
               AND (? IS NULL OR m.id < ?)
             ORDER BY m.id DESC
             LIMIT ?"
        ))
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .bind(before)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// One row per counterpart, most recently active first.
    pub async fn conversations(&self, user_id: i64) -> DatabaseResult<Vec<ConversationSummary>> {
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            "SELECT c.partner_id,
                    u.public_id AS partner_public_id,
                    u.display_name AS partner_display_name,
                    u.email AS partner_email,
                    c.last_message_id,
                    m.created_at AS last_message_at,
                    (SELECT COUNT(*) FROM messages unread
                      WHERE unread.sender_id = c.partner_id
                        AND unread.recipient_id = ?
                        AND unread.read_at IS NULL) AS unread_count
             FROM (
                 SELECT CASE WHEN sender_id = ? THEN recipient_id ELSE sender_id END AS partner_id,
                        MAX(id) AS last_message_id
                 FROM messages
                 WHERE sender_id = ? OR recipient_id = ?
                 GROUP BY partner_id
             ) c
             JOIN users u ON u.id = c.partner_id
             JOIN messages m ON m.id = c.last_message_id
             ORDER BY c.last_message_id DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    /// Marks everything `partner_id` sent to `reader_id` as read.
    pub async fn mark_conversation_read(
        &self,
        reader_id: i64,
        partner_id: i64,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = ?
             WHERE recipient_id = ? AND sender_id = ? AND read_at IS NULL",
        )
        .bind(now_timestamp())
        .bind(reader_id)
        .bind(partner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user_id: i64) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = ? AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("message {id}")));
        }
        Ok(())
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
