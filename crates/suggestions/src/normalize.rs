//! Input normalization and cache key derivation.

use sha2::{Digest, Sha256};

use crate::{ContextMessage, SuggestionError};

pub const CACHE_KEY_PREFIX: &str = "suggestions:v1:";

/// Lowercases, replaces everything except letters, digits, `?` and `'` with
/// spaces, collapses whitespace and truncates to `max_chars` characters.
pub fn normalize(text: &str, max_chars: usize) -> Result<String, SuggestionError> {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '`' => '\'',
            c if c.is_alphanumeric() || c == '?' || c == '\'' => c,
            _ => ' ',
        })
        .flat_map(char::to_lowercase)
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_chars.max(1)).collect();
    let normalized = truncated.trim_end().to_string();

    if normalized.is_empty() {
        return Err(SuggestionError::EmptyMessage);
    }

    Ok(normalized)
}

/// `suggestions:v1:` followed by the hex SHA-256 of the normalized message and
/// the last `window` normalized context lines. Context lines that normalize
/// to nothing are skipped.
pub fn cache_key(
    normalized: &str,
    context: &[ContextMessage],
    window: usize,
    max_chars: usize,
) -> String {
    let lines: Vec<String> = context
        .iter()
        .filter_map(|message| normalize(&message.content, max_chars).ok())
        .collect();
    let start = lines.len().saturating_sub(window);

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    for line in &lines[start..] {
        hasher.update([0x1f]);
        hasher.update(line.as_bytes());
    }

    format!("{CACHE_KEY_PREFIX}{:x}", hasher.finalize())
}

/// Stable number derived from a cache key, used to rotate reply banks.
pub(crate) fn rotation_seed(key: &str) -> usize {
    let hex = key.strip_prefix(CACHE_KEY_PREFIX).unwrap_or(key);
    hex.get(..12)
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .map(|value| value as usize)
        .unwrap_or(0)
}
