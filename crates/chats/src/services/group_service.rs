//! Group chats: membership, roles and group messages.

use std::collections::BTreeSet;

use tracing::info;
use zoro_database::{
    Group, GroupMessage, GroupRepository, GroupRole, NewGroup, NewGroupMessage, NewNotification,
    NotificationKind, SqlitePool, User, UserRepository,
};

use crate::cipher::MessageCipher;
use crate::services::NotificationService;
use crate::types::{
    ChatError, ChatResult, CreateGroupRequest, GroupDetail, GroupMessageView, GroupView,
    HistoryQuery, LeaveOutcome, MemberView, SendGroupMessage,
};
use crate::utils::validation::MAX_NAME_CHARS;
use crate::utils::{MemberAction, Membership, PermissionChecker, Validator};

#[derive(Clone)]
pub struct GroupService {
    groups: GroupRepository,
    users: UserRepository,
    notifications: NotificationService,
    cipher: MessageCipher,
}

impl GroupService {
    pub fn new(pool: SqlitePool, cipher: MessageCipher) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            notifications: NotificationService::new(pool),
            cipher,
        }
    }

    async fn group(&self, public_id: &str) -> ChatResult<Group> {
        self.groups
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("group {public_id}")))
    }

    async fn user(&self, public_id: &str) -> ChatResult<User> {
        self.users
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("user {public_id}")))
    }

    async fn membership(&self, group: &Group, user_id: i64) -> ChatResult<Option<Membership>> {
        Ok(self
            .groups
            .member_role(group.id, user_id)
            .await?
            .map(|role| Membership { user_id, role }))
    }

    /// The group and the caller's membership; non-members get `AccessDenied`.
    async fn member_group(&self, user: &User, group_id: &str) -> ChatResult<(Group, Membership)> {
        let group = self.group(group_id).await?;
        let membership = self
            .membership(&group, user.id)
            .await?
            .ok_or_else(|| ChatError::access_denied("not a member of this group"))?;
        Ok((group, membership))
    }

    async fn detail(&self, group: Group, role: GroupRole) -> ChatResult<GroupDetail> {
        let members = self.groups.members(group.id).await?;
        Ok(GroupDetail {
            group: group.into(),
            role,
            members: members.into_iter().map(MemberView::from).collect(),
        })
    }

    fn message_view(&self, group: &Group, message: GroupMessage) -> ChatResult<GroupMessageView> {
        Ok(GroupMessageView {
            content: self.cipher.decrypt(&message.content)?,
            id: message.public_id,
            group_id: group.public_id.clone(),
            sender_id: message.sender_public_id,
            sender_name: message.sender_display_name,
            message_type: message.message_type,
            created_at: message.created_at,
        })
    }

    async fn notify_added(&self, group: &Group, by: &User, user_ids: &[i64]) {
        for &user_id in user_ids {
            self.notifications
                .notify_quietly(NewNotification {
                    user_id,
                    kind: NotificationKind::GroupInvite,
                    title: format!("{} added you to {}", by.label(), group.name),
                    body: group.description.clone(),
                    link: Some(format!("/groups/{}", group.public_id)),
                })
                .await;
        }
    }

    /// Creates a group owned by `creator`. Member ids are de-duplicated and
    /// the creator is never listed twice.
    pub async fn create_group(
        &self,
        creator: &User,
        request: CreateGroupRequest,
    ) -> ChatResult<GroupDetail> {
        let name = Validator::sanitize_string(&request.name, "group name", MAX_NAME_CHARS)?;
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let mut member_ids = BTreeSet::new();
        for public_id in &request.member_ids {
            let user = self.user(public_id).await?;
            if user.id != creator.id {
                member_ids.insert(user.id);
            }
        }
        let member_ids: Vec<i64> = member_ids.into_iter().collect();

        let group = self
            .groups
            .create(&NewGroup {
                name,
                description,
                created_by: creator.id,
                member_ids: member_ids.clone(),
            })
            .await?;

        info!(
            group_id = %group.public_id,
            creator = %creator.public_id,
            members = member_ids.len() + 1,
            "group created"
        );

        self.notify_added(&group, creator, &member_ids).await;
        self.detail(group, GroupRole::Owner).await
    }

    pub async fn list_groups(&self, user: &User) -> ChatResult<Vec<GroupView>> {
        let groups = self.groups.list_for_member(user.id).await?;
        Ok(groups.into_iter().map(GroupView::from).collect())
    }

    pub async fn get_group(&self, user: &User, group_id: &str) -> ChatResult<GroupDetail> {
        let (group, membership) = self.member_group(user, group_id).await?;
        self.detail(group, membership.role).await
    }

    pub async fn members(&self, user: &User, group_id: &str) -> ChatResult<Vec<MemberView>> {
        let (group, _) = self.member_group(user, group_id).await?;
        let members = self.groups.members(group.id).await?;
        Ok(members.into_iter().map(MemberView::from).collect())
    }

    /// Internal user ids of every member, for real-time fan-out.
    pub async fn member_user_ids(&self, user: &User, group_id: &str) -> ChatResult<Vec<i64>> {
        let (group, _) = self.member_group(user, group_id).await?;
        let members = self.groups.members(group.id).await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    /// Adds users as plain members. Users who already belong are skipped.
    pub async fn add_members(
        &self,
        user: &User,
        group_id: &str,
        member_ids: &[String],
    ) -> ChatResult<Vec<MemberView>> {
        let (group, membership) = self.member_group(user, group_id).await?;
        PermissionChecker::can_manage_members(&membership)?;

        let mut added = Vec::new();
        for public_id in member_ids {
            let target = self.user(public_id).await?;
            if self
                .groups
                .add_member(group.id, target.id, GroupRole::Member)
                .await?
            {
                added.push(target.id);
            }
        }

        info!(group_id, added = added.len(), "group members added");
        self.notify_added(&group, user, &added).await;

        let members = self.groups.members(group.id).await?;
        Ok(members.into_iter().map(MemberView::from).collect())
    }

    pub async fn remove_member(&self, user: &User, group_id: &str, member_id: &str) -> ChatResult<()> {
        let (group, requester) = self.member_group(user, group_id).await?;
        let target_user = self.user(member_id).await?;
        let target = self
            .membership(&group, target_user.id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("member {member_id}")))?;

        PermissionChecker::can_manage_member(&requester, &target, MemberAction::Remove)?;
        self.groups.remove_member(group.id, target.user_id).await?;

        info!(group_id, member = member_id, by = %user.public_id, "group member removed");
        Ok(())
    }

    /// Promotes or demotes a member. Ownership only changes hands through
    /// `leave_group`.
    pub async fn update_role(
        &self,
        user: &User,
        group_id: &str,
        member_id: &str,
        role: GroupRole,
    ) -> ChatResult<MemberView> {
        if role == GroupRole::Owner {
            return Err(ChatError::validation("a group has exactly one owner"));
        }

        let (group, requester) = self.member_group(user, group_id).await?;
        let target_user = self.user(member_id).await?;
        let target = self
            .membership(&group, target_user.id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("member {member_id}")))?;

        PermissionChecker::can_manage_member(&requester, &target, MemberAction::UpdateRole)?;
        self.groups
            .update_member_role(group.id, target.user_id, role)
            .await?;

        let members = self.groups.members(group.id).await?;
        members
            .into_iter()
            .find(|m| m.user_id == target.user_id)
            .map(MemberView::from)
            .ok_or_else(|| ChatError::not_found(format!("member {member_id}")))
    }

    /// Removes the caller. An owner hands ownership to the longest-standing
    /// remaining member; the last member leaving deletes the group.
    pub async fn leave_group(&self, user: &User, group_id: &str) -> ChatResult<LeaveOutcome> {
        let (group, membership) = self.member_group(user, group_id).await?;

        let successor = self.groups.longest_standing_member(group.id, user.id).await?;
        let Some(successor) = successor else {
            self.groups.delete(group.id).await?;
            info!(group_id, "last member left, group deleted");
            return Ok(LeaveOutcome::GroupDeleted);
        };

        let mut new_owner = None;
        if membership.role == GroupRole::Owner {
            self.groups
                .update_member_role(group.id, successor, GroupRole::Owner)
                .await?;
            new_owner = self
                .users
                .find_by_id(successor)
                .await?
                .map(|owner| owner.public_id);
            info!(group_id, new_owner = ?new_owner, "group ownership transferred");
        }

        self.groups.remove_member(group.id, user.id).await?;
        info!(group_id, member = %user.public_id, "member left group");
        Ok(LeaveOutcome::Left { new_owner })
    }

    pub async fn delete_group(&self, user: &User, group_id: &str) -> ChatResult<()> {
        let group = self.group(group_id).await?;
        let membership = self.membership(&group, user.id).await?;
        PermissionChecker::can_delete_group(membership.as_ref(), user)?;

        self.groups.delete(group.id).await?;
        info!(group_id, by = %user.public_id, "group deleted");
        Ok(())
    }

    pub async fn send_message(
        &self,
        user: &User,
        group_id: &str,
        request: SendGroupMessage,
    ) -> ChatResult<GroupMessageView> {
        Validator::message_content(&request.content)?;
        let (group, _) = self.member_group(user, group_id).await?;

        let message = self
            .groups
            .create_message(&NewGroupMessage {
                group_id: group.id,
                sender_id: user.id,
                content: self.cipher.encrypt(&request.content)?,
                message_type: request.message_type,
            })
            .await?;

        self.message_view(&group, message)
    }

    /// Group history, oldest first.
    pub async fn messages(
        &self,
        user: &User,
        group_id: &str,
        query: &HistoryQuery,
    ) -> ChatResult<Vec<GroupMessageView>> {
        let (group, _) = self.member_group(user, group_id).await?;
        let limit = Validator::history_limit(query.limit);

        let before = match query.before.as_deref() {
            Some(public_id) => Some(
                self.groups
                    .find_message(group.id, public_id)
                    .await?
                    .ok_or_else(|| ChatError::not_found(format!("message {public_id}")))?
                    .id,
            ),
            None => None,
        };

        let mut messages = self.groups.messages(group.id, limit, before).await?;
        messages.reverse();
        messages
            .into_iter()
            .map(|m| self.message_view(&group, m))
            .collect()
    }
}
