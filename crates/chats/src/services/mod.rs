//! Business logic for the chat domain. Services are cheap to clone; each
//! owns the repositories it needs over a shared pool.

pub mod admin_service;
pub mod code_session_service;
pub mod event_service;
pub mod group_service;
pub mod message_service;
pub mod notification_service;
pub mod vault_service;

pub use admin_service::AdminService;
pub use code_session_service::CodeSessionService;
pub use event_service::EventService;
pub use group_service::GroupService;
pub use message_service::MessageService;
pub use notification_service::NotificationService;
pub use vault_service::VaultService;
