//! Site administration. Every entry point checks the caller's role first.

use tracing::{info, warn};
use zoro_database::{
    GroupRepository, MessageRepository, SettingsRepository, SqlitePool, User, UserRepository,
    UserRole, VaultRepository,
};

use crate::types::{AdminStats, ChatError, ChatResult, SettingView};

const MAX_SETTING_KEY_CHARS: usize = 64;

#[derive(Clone)]
pub struct AdminService {
    users: UserRepository,
    messages: MessageRepository,
    groups: GroupRepository,
    vault: VaultRepository,
    settings: SettingsRepository,
}

fn require_admin(user: &User) -> ChatResult<()> {
    if !user.is_admin() {
        warn!(user = %user.public_id, "non-admin attempted an admin action");
        return Err(ChatError::permission_denied("admin role required"));
    }
    Ok(())
}

fn setting_key(key: &str) -> ChatResult<&str> {
    let key = key.trim();
    let valid = !key.is_empty()
        && key.len() <= MAX_SETTING_KEY_CHARS
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(ChatError::validation(
            "setting keys use letters, digits, '_', '-' or '.'",
        ));
    }
    Ok(key)
}

impl AdminService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            vault: VaultRepository::new(pool.clone()),
            settings: SettingsRepository::new(pool),
        }
    }

    async fn target(&self, public_id: &str) -> ChatResult<User> {
        self.users
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ChatError::not_found(format!("user {public_id}")))
    }

    pub async fn stats(&self, admin: &User) -> ChatResult<AdminStats> {
        require_admin(admin)?;
        Ok(AdminStats {
            users: self.users.count().await?,
            direct_messages: self.messages.count().await?,
            group_messages: self.groups.count_messages().await?,
            groups: self.groups.count().await?,
            files: self.vault.count_files().await?,
        })
    }

    pub async fn list_users(
        &self,
        admin: &User,
        search: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ChatResult<Vec<User>> {
        require_admin(admin)?;
        let limit = limit.unwrap_or(50).clamp(1, 200);
        let offset = offset.unwrap_or(0).max(0);
        Ok(self.users.list(search, limit, offset).await?)
    }

    pub async fn set_role(&self, admin: &User, user_id: &str, role: UserRole) -> ChatResult<User> {
        require_admin(admin)?;
        let target = self.target(user_id).await?;
        if target.id == admin.id && role != UserRole::Admin {
            return Err(ChatError::validation("admins cannot demote themselves"));
        }

        let updated = self.users.update_role(target.id, role).await?;
        info!(user = user_id, role = role.as_str(), by = %admin.public_id, "user role changed");
        Ok(updated)
    }

    pub async fn delete_user(&self, admin: &User, user_id: &str) -> ChatResult<()> {
        require_admin(admin)?;
        let target = self.target(user_id).await?;
        if target.id == admin.id {
            return Err(ChatError::validation("admins cannot delete their own account"));
        }

        self.users.delete(target.id).await?;
        info!(user = user_id, by = %admin.public_id, "user deleted");
        Ok(())
    }

    pub async fn settings(&self, admin: &User) -> ChatResult<Vec<SettingView>> {
        require_admin(admin)?;
        let settings = self.settings.list().await?;
        Ok(settings.into_iter().map(SettingView::from).collect())
    }

    pub async fn put_setting(
        &self,
        admin: &User,
        key: &str,
        value: serde_json::Value,
    ) -> ChatResult<SettingView> {
        require_admin(admin)?;
        let key = setting_key(key)?;
        let stored = self
            .settings
            .upsert(key, &value.to_string(), admin.id)
            .await?;
        Ok(stored.into())
    }

    pub async fn delete_setting(&self, admin: &User, key: &str) -> ChatResult<()> {
        require_admin(admin)?;
        self.settings.delete(setting_key(key)?).await?;
        info!(key, by = %admin.public_id, "setting deleted");
        Ok(())
    }
}
