//! Group permission rules.

use zoro_database::{GroupRole, User};

use crate::types::{ChatError, ChatResult};

/// Actions one member can take on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    UpdateRole,
    Remove,
}

/// A member as seen by permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub user_id: i64,
    pub role: GroupRole,
}

pub struct PermissionChecker;

impl PermissionChecker {
    pub fn can_manage_members(member: &Membership) -> ChatResult<()> {
        if !member.role.can_manage_members() {
            return Err(ChatError::permission_denied(
                "only owners and admins can manage members",
            ));
        }
        Ok(())
    }

    /// Group owners and site admins may delete a group.
    pub fn can_delete_group(member: Option<&Membership>, user: &User) -> ChatResult<()> {
        let is_owner = member.is_some_and(|m| m.role == GroupRole::Owner);
        if !is_owner && !user.is_admin() {
            return Err(ChatError::permission_denied(
                "only the group owner can delete the group",
            ));
        }
        Ok(())
    }

    pub fn can_manage_member(
        requester: &Membership,
        target: &Membership,
        action: MemberAction,
    ) -> ChatResult<()> {
        if requester.user_id == target.user_id {
            return Err(ChatError::permission_denied(
                "cannot perform this action on yourself",
            ));
        }

        match action {
            MemberAction::UpdateRole => {
                if matches!(target.role, GroupRole::Owner | GroupRole::Admin) {
                    if requester.role != GroupRole::Owner {
                        return Err(ChatError::permission_denied(
                            "only the owner can change the role of an admin",
                        ));
                    }
                } else {
                    Self::can_manage_members(requester)?;
                }
            }
            MemberAction::Remove => {
                if target.role == GroupRole::Owner {
                    return Err(ChatError::permission_denied("cannot remove the group owner"));
                }
                if target.role == GroupRole::Admin && requester.role == GroupRole::Admin {
                    return Err(ChatError::permission_denied(
                        "admins cannot remove other admins",
                    ));
                }
                Self::can_manage_members(requester)?;
            }
        }

        Ok(())
    }
}
