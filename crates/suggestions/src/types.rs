use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SuggestionError;

/// A prior line of the conversation, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    #[serde(default)]
    pub sender: Option<String>,
    pub content: String,
}

impl ContextMessage {
    pub fn new(sender: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.map(str::to_owned),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub message: String,
    #[serde(default)]
    pub context: Vec<ContextMessage>,
    /// Used to avoid repeating suggestions the same user saw recently.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

impl SuggestionRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_context(mut self, context: Vec<ContextMessage>) -> Self {
        self.context = context;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Cache,
    Template,
    Contextual,
    Ai,
    Fallback,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::Cache => "cache",
            SuggestionSource::Template => "template",
            SuggestionSource::Contextual => "contextual",
            SuggestionSource::Ai => "ai",
            SuggestionSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Technical,
    Work,
    Social,
    Food,
    Travel,
    Health,
    Finance,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Technical,
        Domain::Work,
        Domain::Social,
        Domain::Food,
        Domain::Travel,
        Domain::Health,
        Domain::Finance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Technical => "technical",
            Domain::Work => "work",
            Domain::Social => "social",
            Domain::Food => "food",
            Domain::Travel => "travel",
            Domain::Health => "health",
            Domain::Finance => "finance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAnalysis {
    /// Template category when one matched, otherwise the strongest domain or `general`.
    pub category: String,
    pub domains: Vec<Domain>,
    pub sentiment: Sentiment,
    pub is_question: bool,
    pub urgent: bool,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
    pub source: SuggestionSource,
    pub cached: bool,
    pub analysis: MessageAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Friendly,
    Formal,
    Concise,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Friendly => "friendly",
            Tone::Formal => "formal",
            Tone::Concise => "concise",
        }
    }
}

impl Default for Tone {
    fn default() -> Self {
        Tone::Friendly
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = SuggestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" | "casual" => Ok(Tone::Friendly),
            "formal" | "professional" => Ok(Tone::Formal),
            "concise" | "short" => Ok(Tone::Concise),
            other => Err(SuggestionError::InvalidTone(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedMessage {
    pub original: String,
    pub improved: String,
    pub tone: Tone,
    pub source: SuggestionSource,
}

/// Point-in-time counters for the suggestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub template_hits: u64,
    pub contextual_hits: u64,
    pub ai_requests: u64,
    pub ai_failures: u64,
    pub fallbacks: u64,
    pub cache_hit_rate: f64,
    pub memory_entries: usize,
    pub redis_enabled: bool,
}
