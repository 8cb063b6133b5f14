//! Shared request, response and error types for the chat services.

pub mod errors;
pub mod requests;
pub mod responses;

pub use errors::{ChatError, ChatResult};
pub use requests::*;
pub use responses::*;
