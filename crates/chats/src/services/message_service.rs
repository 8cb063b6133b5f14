//! One-to-one messaging.

use tracing::info;
use zoro_database::{
    DirectMessage, MessageRepository, NewDirectMessage, NewNotification, NotificationKind,
    SqlitePool, User, UserRepository,
};

use crate::cipher::MessageCipher;
use crate::services::NotificationService;
use crate::types::{
    ChatError, ChatResult, ConversationPartner, ConversationView, HistoryQuery, MessageView,
    SendDirectMessage,
};
use crate::utils::Validator;

const PREVIEW_CHARS: usize = 80;

/// First `PREVIEW_CHARS` characters of a message, for notification bodies.
pub(crate) fn preview(content: &str) -> String {
    let trimmed = content.trim();
    let mut preview: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    if trimmed.chars().count() > PREVIEW_CHARS {
        preview.push('\u{2026}');
    }
    preview
}

#[derive(Clone)]
pub struct MessageService {
    messages: MessageRepository,
    users: UserRepository,
    notifications: NotificationService,
    cipher: MessageCipher,
}

impl MessageService {
    pub fn new(pool: SqlitePool, cipher: MessageCipher) -> Self {
        Self {
            messages: MessageRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            notifications: NotificationService::new(pool),
            cipher,
        }
    }

    async fn user(&self, public_id: &str) -> ChatResult<User> {
        self.users
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("user {public_id}")))
    }

    fn view(&self, message: DirectMessage) -> ChatResult<MessageView> {
        Ok(MessageView {
            content: self.cipher.decrypt(&message.content)?,
            id: message.public_id,
            sender_id: message.sender_public_id,
            recipient_id: message.recipient_public_id,
            message_type: message.message_type,
            read_at: message.read_at,
            created_at: message.created_at,
        })
    }

    pub async fn send_direct(
        &self,
        sender: &User,
        request: SendDirectMessage,
    ) -> ChatResult<MessageView> {
        Validator::message_content(&request.content)?;

        let recipient = self.user(&request.recipient_id).await?;
        if recipient.id == sender.id {
            return Err(ChatError::validation("cannot send a message to yourself"));
        }

        let stored = self
            .messages
            .create(&NewDirectMessage {
                sender_id: sender.id,
                recipient_id: recipient.id,
                content: self.cipher.encrypt(&request.content)?,
                message_type: request.message_type,
            })
            .await?;

        info!(
            message_id = %stored.public_id,
            sender = %sender.public_id,
            recipient = %recipient.public_id,
            "direct message sent"
        );

        self.notifications
            .notify_quietly(NewNotification {
                user_id: recipient.id,
                kind: NotificationKind::DirectMessage,
                title: format!("New message from {}", sender.label()),
                body: Some(preview(&request.content)),
                link: Some(format!("/messages/{}", sender.public_id)),
            })
            .await;

        self.view(stored)
    }

    /// Messages exchanged with `partner_id`, oldest first, ending at `before`
    /// when given.
    pub async fn conversation(
        &self,
        user: &User,
        partner_id: &str,
        query: &HistoryQuery,
    ) -> ChatResult<Vec<MessageView>> {
        let partner = self.user(partner_id).await?;
        let limit = Validator::history_limit(query.limit);

        let before = match query.before.as_deref() {
            Some(public_id) => Some(
                self.messages
                    .find_by_public_id(public_id)
                    .await?
                    .ok_or_else(|| ChatError::not_found(format!("message {public_id}")))?
                    .id,
            ),
            None => None,
        };

        let mut messages = self
            .messages
            .conversation(user.id, partner.id, limit, before)
            .await?;
        messages.reverse();

        messages.into_iter().map(|m| self.view(m)).collect()
    }

    pub async fn conversations(&self, user: &User) -> ChatResult<Vec<ConversationView>> {
        let summaries = self.messages.conversations(user.id).await?;
        let mut conversations = Vec::with_capacity(summaries.len());

        for summary in summaries {
            let last_message = match self.messages.find_by_id(summary.last_message_id).await? {
                Some(message) => Some(self.view(message)?),
                None => None,
            };

            conversations.push(ConversationView {
                partner: ConversationPartner {
                    id: summary.partner_public_id,
                    email: summary.partner_email,
                    display_name: summary.partner_display_name,
                },
                last_message,
                unread_count: summary.unread_count,
            });
        }

        Ok(conversations)
    }

    /// Marks everything `partner_id` sent to `user` as read.
    pub async fn mark_read(&self, user: &User, partner_id: &str) -> ChatResult<u64> {
        let partner = self.user(partner_id).await?;
        Ok(self.messages.mark_conversation_read(user.id, partner.id).await?)
    }

    pub async fn unread_count(&self, user: &User) -> ChatResult<i64> {
        Ok(self.messages.unread_count(user.id).await?)
    }

    /// Only the sender may delete; the message disappears for both sides.
    pub async fn delete_message(&self, user: &User, message_id: &str) -> ChatResult<()> {
        let message = self
            .messages
            .find_by_public_id(message_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("message {message_id}")))?;

        if message.sender_id != user.id {
            return Err(ChatError::permission_denied(
                "only the sender can delete a message",
            ));
        }

        self.messages.delete(message.id).await?;
        info!(message_id, user = %user.public_id, "direct message deleted");
        Ok(())
    }

    /// Looks up a user by public id for callers that route by user.
    pub async fn find_user(&self, public_id: &str) -> ChatResult<User> {
        self.user(public_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_messages() {
        assert_eq!(preview("  short  "), "short");
        let long = "x".repeat(PREVIEW_CHARS + 5);
        let shortened = preview(&long);
        assert_eq!(shortened.chars().count(), PREVIEW_CHARS + 1);
        assert!(shortened.ends_with('\u{2026}'));
    }
}
