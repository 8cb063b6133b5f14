//! The Zoro vault: file metadata and peer-to-peer sharing.

use std::collections::HashSet;

use tracing::info;
use zoro_database::{
    NewNotification, NewShare, NewZoroFile, NotificationKind, ShareStatus, SharedFile,
    SqlitePool, User, UserRepository, VaultRepository, ZoroFile,
};

use crate::services::NotificationService;
use crate::types::{ChatError, ChatResult, FileView, RegisterFileRequest, ShareFileRequest, ShareView};
use crate::utils::Validator;

#[derive(Clone)]
pub struct VaultService {
    vault: VaultRepository,
    users: UserRepository,
    notifications: NotificationService,
}

impl VaultService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vault: VaultRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            notifications: NotificationService::new(pool),
        }
    }

    async fn file(&self, public_id: &str) -> ChatResult<ZoroFile> {
        self.vault
            .find_file_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("file {public_id}")))
    }

    async fn share(&self, public_id: &str) -> ChatResult<SharedFile> {
        self.vault
            .find_share_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("share {public_id}")))
    }

    pub async fn register_file(
        &self,
        owner: &User,
        request: RegisterFileRequest,
    ) -> ChatResult<FileView> {
        Validator::file_name(&request.file_name)?;
        Validator::file_size(request.size_bytes)?;
        Validator::url(&request.file_url)?;

        let mime_type = match request.mime_type.trim() {
            "" => "application/octet-stream".to_string(),
            mime => mime.to_string(),
        };

        let file = self
            .vault
            .create_file(&NewZoroFile {
                owner_id: owner.id,
                file_name: request.file_name.trim().to_string(),
                mime_type,
                size_bytes: request.size_bytes,
                file_url: request.file_url,
            })
            .await?;

        info!(file_id = %file.public_id, owner = %owner.public_id, size = file.size_bytes, "file registered");
        Ok(file.into())
    }

    /// Files the user owns followed by files shared with them and accepted.
    pub async fn list_files(&self, user: &User) -> ChatResult<Vec<FileView>> {
        let owned = self.vault.list_owned(user.id).await?;
        let received = self.vault.list_received(user.id).await?;

        let mut seen = HashSet::new();
        Ok(owned
            .into_iter()
            .chain(received)
            .filter(|file| seen.insert(file.id))
            .map(FileView::from)
            .collect())
    }

    pub async fn delete_file(&self, user: &User, file_id: &str) -> ChatResult<()> {
        let file = self.file(file_id).await?;
        if file.owner_id != user.id {
            return Err(ChatError::permission_denied("only the owner can delete a file"));
        }

        self.vault.delete_file(file.id).await?;
        info!(file_id, owner = %user.public_id, "file deleted");
        Ok(())
    }

    pub async fn share_file(
        &self,
        sender: &User,
        file_id: &str,
        request: ShareFileRequest,
    ) -> ChatResult<ShareView> {
        let file = self.file(file_id).await?;
        if file.owner_id != sender.id {
            return Err(ChatError::permission_denied("only the owner can share a file"));
        }

        let recipient = self
            .users
            .find_by_public_id(&request.recipient_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("user {}", request.recipient_id)))?;
        if recipient.id == sender.id {
            return Err(ChatError::validation("cannot share a file with yourself"));
        }
        if self.vault.has_pending_share(file.id, recipient.id).await? {
            return Err(ChatError::conflict(
                "a share of this file with that user is already pending",
            ));
        }

        let note = request
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let share = self
            .vault
            .create_share(&NewShare {
                file_id: file.id,
                sender_id: sender.id,
                recipient_id: recipient.id,
                note: note.clone(),
            })
            .await?;

        info!(share_id = %share.public_id, file_id, recipient = %recipient.public_id, "file shared");

        self.notifications
            .notify_quietly(NewNotification {
                user_id: recipient.id,
                kind: NotificationKind::FileShared,
                title: format!("{} shared {} with you", sender.label(), file.file_name),
                body: note,
                link: Some(format!("/zoro/shares/{}", share.public_id)),
            })
            .await;

        Ok(share.into())
    }

    /// Accepts or declines a pending share addressed to `user`.
    pub async fn respond_to_share(
        &self,
        user: &User,
        share_id: &str,
        accept: bool,
    ) -> ChatResult<ShareView> {
        let share = self.share(share_id).await?;
        if share.recipient_id != user.id {
            return Err(ChatError::access_denied("share was not sent to you"));
        }
        if share.status != ShareStatus::Pending {
            return Err(ChatError::conflict(format!(
                "share already {}",
                share.status.as_str()
            )));
        }

        let status = if accept {
            ShareStatus::Accepted
        } else {
            ShareStatus::Declined
        };
        let updated = self.vault.respond(share.id, status).await?;

        info!(share_id, status = status.as_str(), "share answered");

        self.notifications
            .notify_quietly(NewNotification {
                user_id: share.sender_id,
                kind: NotificationKind::FileShareResponse,
                title: format!(
                    "{} {} {}",
                    user.label(),
                    status.as_str(),
                    share.file_name
                ),
                body: None,
                link: Some(format!("/zoro/shares/{}", share.public_id)),
            })
            .await;

        Ok(updated.into())
    }

    pub async fn incoming_shares(
        &self,
        user: &User,
        status: Option<ShareStatus>,
    ) -> ChatResult<Vec<ShareView>> {
        let shares = self.vault.incoming(user.id, status).await?;
        Ok(shares.into_iter().map(ShareView::from).collect())
    }

    pub async fn outgoing_shares(&self, user: &User) -> ChatResult<Vec<ShareView>> {
        let shares = self.vault.outgoing(user.id).await?;
        Ok(shares.into_iter().map(ShareView::from).collect())
    }
}
