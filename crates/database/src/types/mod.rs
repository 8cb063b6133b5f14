//! Shared types and result aliases for the database layer

pub mod errors;

pub use errors::DatabaseError;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Current time in the fixed-width RFC 3339 form stored in every timestamp column.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Opaque public handle for a new row.
pub fn new_public_id() -> String {
    cuid2::cuid()
}
