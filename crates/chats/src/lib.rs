//! # Zoro Chats Crate
//!
//! Business logic for the chat domain: direct and group messaging,
//! notifications, the Zoro file vault, shared code sessions, team events,
//! site administration and Coffee Break pairing.
//!
//! ## Architecture
//!
//! - **Services**: one service per area, built over `zoro-database` repositories
//! - **Cipher**: at-rest encryption for message bodies
//! - **Types**: requests, response views and `ChatError`
//! - **Utils**: validation and group permission checks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zoro_chats::{MessageCipher, MessageService, SendDirectMessage};
//!
//! let service = MessageService::new(pool, cipher);
//! let message = service.send_direct(&sender, request).await?;
//! ```

pub mod cipher;
pub mod coffee_break;
pub mod services;
pub mod types;
pub mod utils;

pub use cipher::{CipherError, MessageCipher, ENCRYPTED_PREFIX};
pub use coffee_break::{CoffeeBreakMatcher, JoinOutcome, Pairing};
pub use services::{
    AdminService, CodeSessionService, EventService, GroupService, MessageService,
    NotificationService, VaultService,
};
pub use types::*;
pub use utils::{MemberAction, Membership, PermissionChecker, Validator};
