//! Notification repository for database operations.

use sqlx::SqlitePool;

use crate::entities::{NewNotification, Notification};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const NOTIFICATION_COLUMNS: &str = "id, public_id, user_id, kind, title, body, link, is_read, created_at";

/// Repository for notification database operations
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &NewNotification) -> DatabaseResult<Notification> {
        let result = sqlx::query(
            "INSERT INTO notifications (public_id, user_id, kind, title, body, link, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(new_public_id())
        .bind(request.user_id)
        .bind(request.kind)
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.link)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("notification {id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }

    /// Finds a notification only if it belongs to `user_id`.
    pub async fn find_for_user(&self, user_id: i64, public_id: &str) -> DatabaseResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? AND public_id = ?"
        ))
        .bind(user_id)
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }

    pub async fn list(&self, user_id: i64, unread_only: bool, limit: i64) -> DatabaseResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ? AND (? = 0 OR is_read = 0)
             ORDER BY id DESC
             LIMIT ?"
        ))
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn mark_read(&self, id: i64) -> DatabaseResult<()> {
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> DatabaseResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("notification {id}")));
        }
        Ok(())
    }

    pub async fn unread_count(&self, user_id: i64) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
