//! Error types for the database layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    ConnectionError(String),

    #[error("database migration error: {0}")]
    MigrationError(String),

    #[error("database query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("duplicate entity: {0}")]
    Duplicate(String),
}

impl DatabaseError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// True when the underlying SQLite error is a UNIQUE/PRIMARY KEY violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Duplicate(_) => true,
            DatabaseError::Query(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
