//! Error types for the chat services.

use thiserror::Error;
use zoro_database::DatabaseError;

use crate::cipher::CipherError;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("database error: {0}")]
    Database(DatabaseError),

    #[error("message encryption error: {0}")]
    Cipher(#[from] CipherError),

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },
}

impl ChatError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

// Repository misses surface as NotFound so callers only match one variant.
impl From<DatabaseError> for ChatError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => Self::NotFound { what },
            DatabaseError::Duplicate(what) => Self::Conflict {
                message: format!("{what} already exists"),
            },
            other => Self::Database(other),
        }
    }
}
