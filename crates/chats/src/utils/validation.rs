//! Input validation shared by the services.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::{ChatError, ChatResult};

pub const MAX_MESSAGE_CHARS: usize = 4_000;
pub const MAX_FILE_SIZE_BYTES: i64 = 100 * 1024 * 1024;
pub const MAX_CODE_CHARS: usize = 200_000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_FILE_NAME_CHARS: usize = 255;
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

pub struct Validator;

impl Validator {
    /// Non-blank and at most `MAX_MESSAGE_CHARS` characters.
    pub fn message_content(content: &str) -> ChatResult<()> {
        if content.trim().is_empty() {
            return Err(ChatError::validation("message content cannot be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::validation(format!(
                "message content too long (max {MAX_MESSAGE_CHARS} characters)"
            )));
        }
        Ok(())
    }

    pub fn file_name(file_name: &str) -> ChatResult<()> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(ChatError::validation("file name cannot be empty"));
        }
        if file_name.chars().count() > MAX_FILE_NAME_CHARS {
            return Err(ChatError::validation(format!(
                "file name too long (max {MAX_FILE_NAME_CHARS} characters)"
            )));
        }

        let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
        if let Some(c) = file_name.chars().find(|c| invalid_chars.contains(c)) {
            return Err(ChatError::validation(format!(
                "file name contains invalid character: {c}"
            )));
        }
        Ok(())
    }

    pub fn file_size(size_bytes: i64) -> ChatResult<()> {
        if size_bytes < 0 {
            return Err(ChatError::validation("file size cannot be negative"));
        }
        if size_bytes > MAX_FILE_SIZE_BYTES {
            return Err(ChatError::validation(format!(
                "file too large (max {} MiB)",
                MAX_FILE_SIZE_BYTES / (1024 * 1024)
            )));
        }
        Ok(())
    }

    pub fn url(url: &str) -> ChatResult<()> {
        if url.trim().is_empty() {
            return Err(ChatError::validation("file url cannot be empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ChatError::validation(
                "file url must start with http:// or https://",
            ));
        }
        Ok(())
    }

    pub fn code_content(content: &str) -> ChatResult<()> {
        if content.chars().count() > MAX_CODE_CHARS {
            return Err(ChatError::validation(format!(
                "code too long (max {MAX_CODE_CHARS} characters)"
            )));
        }
        Ok(())
    }

    /// Trims `input`, rejecting blank or overlong values.
    pub fn sanitize_string(input: &str, field: &str, max_chars: usize) -> ChatResult<String> {
        let sanitized = input.trim();
        if sanitized.is_empty() {
            return Err(ChatError::validation(format!("{field} cannot be empty")));
        }
        if sanitized.chars().count() > max_chars {
            return Err(ChatError::validation(format!(
                "{field} too long (max {max_chars} characters)"
            )));
        }
        Ok(sanitized.to_string())
    }

    /// Parses an RFC 3339 timestamp and returns it in the stored UTC form.
    pub fn timestamp(value: &str, field: &str) -> ChatResult<String> {
        let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|e| {
            ChatError::validation(format!("{field} must be an RFC 3339 timestamp: {e}"))
        })?;
        Ok(parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn history_limit(limit: Option<i64>) -> i64 {
        limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_content_bounds() {
        assert!(Validator::message_content("hi").is_ok());
        assert!(Validator::message_content("   ").is_err());
        assert!(Validator::message_content(&"é".repeat(MAX_MESSAGE_CHARS)).is_ok());
        assert!(Validator::message_content(&"a".repeat(MAX_MESSAGE_CHARS + 1)).is_err());
    }

    #[test]
    fn file_checks() {
        assert!(Validator::file_name("report.pdf").is_ok());
        assert!(Validator::file_name("../etc/passwd").is_err());
        assert!(Validator::file_name(" ").is_err());

        assert!(Validator::file_size(0).is_ok());
        assert!(Validator::file_size(MAX_FILE_SIZE_BYTES).is_ok());
        assert!(Validator::file_size(MAX_FILE_SIZE_BYTES + 1).is_err());
        assert!(Validator::file_size(-1).is_err());

        assert!(Validator::url("https://cdn.example.com/a.png").is_ok());
        assert!(Validator::url("ftp://example.com/a.png").is_err());
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        assert_eq!(
            Validator::timestamp("2026-03-01T10:00:00+02:00", "starts_at").unwrap(),
            "2026-03-01T08:00:00.000000Z"
        );
        assert!(Validator::timestamp("next tuesday", "starts_at").is_err());
    }

    #[test]
    fn sanitize_and_limits() {
        assert_eq!(
            Validator::sanitize_string("  Team  ", "name", 10).unwrap(),
            "Team"
        );
        assert!(Validator::sanitize_string("abcdefghijk", "name", 10).is_err());
        assert_eq!(Validator::history_limit(None), DEFAULT_HISTORY_LIMIT);
        assert_eq!(Validator::history_limit(Some(0)), 1);
        assert_eq!(Validator::history_limit(Some(10_000)), MAX_HISTORY_LIMIT);
    }
}
