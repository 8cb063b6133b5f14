//! Domain entities for the database layer

pub mod code_session;
pub mod event;
pub mod group;
pub mod message;
pub mod notification;
pub mod user;
pub mod vault;

pub use code_session::{CodeSession, NewCodeSession};
pub use event::{Event, NewEvent, Setting, UpdateEvent};
pub use group::{Group, GroupMember, GroupMessage, GroupRole, NewGroup, NewGroupMessage};
pub use message::{ConversationSummary, DirectMessage, MessageType, NewDirectMessage};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use user::{NewUser, UpdateProfile, User, UserRole};
pub use vault::{NewShare, NewZoroFile, ShareStatus, SharedFile, ZoroFile};
