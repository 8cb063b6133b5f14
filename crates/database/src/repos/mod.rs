//! Database repository implementations

pub mod code_session_repository;
pub mod event_repository;
pub mod group_repository;
pub mod message_repository;
pub mod notification_repository;
pub mod user_repository;
pub mod vault_repository;

pub use code_session_repository::CodeSessionRepository;
pub use event_repository::{EventRepository, SettingsRepository};
pub use group_repository::GroupRepository;
pub use message_repository::MessageRepository;
pub use notification_repository::NotificationRepository;
pub use user_repository::UserRepository;
pub use vault_repository::VaultRepository;
