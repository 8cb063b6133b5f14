//! Reply suggestions for the chat composer.
//!
//! A request flows through a fixed chain: the message is normalized and
//! hashed into a cache key, a cached candidate pool is reused when present,
//! otherwise canned templates, contextual heuristics, an optional text
//! generator and finally generic replies fill the pool. Suggestions already
//! shown to the same user recently are filtered out before returning.

use thiserror::Error;

pub mod analysis;
pub mod cache;
pub mod normalize;
pub mod service;
pub mod templates;
pub mod types;

pub use analysis::{analyze, contextual_suggestions};
pub use cache::{CacheBackend, CacheEntry, CacheError, MemoryCache, RedisCache, TieredCache};
pub use normalize::{cache_key, normalize, CACHE_KEY_PREFIX};
pub use service::SuggestionService;
pub use templates::{match_template, TemplateMatch};
pub use types::{
    ContextMessage, Domain, ImprovedMessage, MessageAnalysis, Sentiment, SuggestionRequest,
    SuggestionResponse, SuggestionSource, SuggestionStats, Tone,
};

/// Longest message `improve` accepts.
pub const MAX_IMPROVE_CHARS: usize = 4_000;

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("message exceeds {max} characters")]
    MessageTooLong { max: usize },
    #[error("unknown tone '{0}'")]
    InvalidTone(String),
}
