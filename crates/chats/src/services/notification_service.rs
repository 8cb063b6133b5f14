//! Per-user notification inbox.

use tracing::warn;
use zoro_database::{NewNotification, Notification, NotificationRepository, SqlitePool};

use crate::types::{ChatError, ChatResult};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
}

impl NotificationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            notifications: NotificationRepository::new(pool),
        }
    }

    pub async fn notify(&self, notification: NewNotification) -> ChatResult<Notification> {
        Ok(self.notifications.create(&notification).await?)
    }

    /// Side-channel variant used by other services; a failed insert is logged
    /// and never fails the caller's operation.
    pub(crate) async fn notify_quietly(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        if let Err(error) = self.notifications.create(&notification).await {
            warn!(user_id, kind = notification.kind.as_str(), %error, "failed to store notification");
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: Option<i64>,
    ) -> ChatResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Ok(self.notifications.list(user_id, unread_only, limit).await?)
    }

    async fn owned(&self, user_id: i64, public_id: &str) -> ChatResult<Notification> {
        self.notifications
            .find_for_user(user_id, public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("notification {public_id}")))
    }

    pub async fn mark_read(&self, user_id: i64, public_id: &str) -> ChatResult<()> {
        let notification = self.owned(user_id, public_id).await?;
        self.notifications.mark_read(notification.id).await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> ChatResult<u64> {
        Ok(self.notifications.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, user_id: i64, public_id: &str) -> ChatResult<()> {
        let notification = self.owned(user_id, public_id).await?;
        self.notifications.delete(notification.id).await?;
        Ok(())
    }

    pub async fn unread_count(&self, user_id: i64) -> ChatResult<i64> {
        Ok(self.notifications.unread_count(user_id).await?)
    }
}
