use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use zoro_config::{CacheConfig, SuggestionConfig};
use zoro_orchestrator::{GenerationRequest, TextGenerator};

use crate::analysis::{analyze, contextual_suggestions, rotate};
use crate::cache::TieredCache;
use crate::normalize::{cache_key, normalize, rotation_seed};
use crate::templates::{match_template, TemplateMatch};
use crate::types::{
    ImprovedMessage, MessageAnalysis, SuggestionRequest, SuggestionResponse, SuggestionSource,
    SuggestionStats, Tone,
};
use crate::{SuggestionError, MAX_IMPROVE_CHARS};

const CLEAR_PREFIX: &str = "suggestions:";
const RECENT_KEY_PREFIX: &str = "suggestions:recent:v1:";
const MAX_AI_LINE_CHARS: usize = 200;
const MAX_SENDER_CHARS: usize = 64;

const FALLBACK_REPLIES: &[&str] = &[
    "Got it!",
    "Sounds good.",
    "Thanks for letting me know.",
    "Interesting, tell me more.",
    "Okay!",
    "I'll get back to you on that.",
];

const FILLER_WORDS: &[&str] = &[
    "just", "really", "very", "basically", "actually", "literally", "totally", "simply",
];

const FORMAL_EXPANSIONS: &[(&str, &str)] = &[
    ("can't", "cannot"),
    ("won't", "will not"),
    ("don't", "do not"),
    ("doesn't", "does not"),
    ("didn't", "did not"),
    ("isn't", "is not"),
    ("aren't", "are not"),
    ("i'm", "I am"),
    ("it's", "it is"),
    ("gonna", "going to"),
    ("wanna", "want to"),
    ("yeah", "yes"),
];

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    template_hits: AtomicU64,
    contextual_hits: AtomicU64,
    ai_requests: AtomicU64,
    ai_failures: AtomicU64,
    fallbacks: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Candidate pool as stored under a cache key.
#[derive(Debug, Serialize, Deserialize)]
struct CachedPool {
    suggestions: Vec<String>,
    source: SuggestionSource,
}

struct Prepared {
    key: String,
    seed: usize,
    count: usize,
    template: Option<TemplateMatch>,
    analysis: MessageAnalysis,
}

pub struct SuggestionService {
    config: SuggestionConfig,
    cache: TieredCache,
    /// Per-user recent lists, kept apart from pools so they are not the
    /// first thing evicted when memory fills up.
    recent: TieredCache,
    ttl: Duration,
    generator: Option<Arc<dyn TextGenerator>>,
    counters: Counters,
}

impl SuggestionService {
    pub fn new(mut config: SuggestionConfig, cache_config: &CacheConfig, cache: TieredCache) -> Self {
        config.default_count = config.default_count.max(1);
        config.max_count = config.max_count.max(config.default_count);
        config.max_message_chars = config.max_message_chars.max(1);

        Self {
            config,
            recent: cache.sibling(cache_config.memory_capacity),
            cache,
            ttl: Duration::from_secs(cache_config.ttl_seconds.max(1)),
            generator: None,
            counters: Counters::default(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn ai_available(&self) -> bool {
        self.config.ai_enabled && self.generator.is_some()
    }

    fn prepare(&self, request: &SuggestionRequest) -> Result<Prepared, SuggestionError> {
        let normalized = normalize(&request.message, self.config.max_message_chars)?;
        let key = cache_key(
            &normalized,
            &request.context,
            self.config.context_window,
            self.config.max_message_chars,
        );
        let count = request
            .count
            .unwrap_or(self.config.default_count)
            .clamp(1, self.config.max_count);
        let template = match_template(&normalized);
        let analysis = analyze(&normalized, template.map(|t| t.category));

        Ok(Prepared {
            seed: rotation_seed(&key),
            key,
            count,
            template,
            analysis,
        })
    }

    /// Heuristic pipeline: cache, templates, contextual replies, the text
    /// generator when the pool is still short, then generic replies.
    pub async fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> Result<SuggestionResponse, SuggestionError> {
        bump(&self.counters.requests);
        let prepared = self.prepare(request)?;
        Ok(self.run_pipeline(request, prepared, true).await)
    }

    /// Asks the text generator first and only falls back to the heuristic
    /// pipeline when it is unavailable or returns nothing usable.
    pub async fn suggest_ai(
        &self,
        request: &SuggestionRequest,
    ) -> Result<SuggestionResponse, SuggestionError> {
        bump(&self.counters.requests);
        let prepared = self.prepare(request)?;

        if self.ai_available() {
            if let Some(lines) = self.generate_replies(request, &prepared).await {
                return Ok(self
                    .finalize(request, &prepared, lines, SuggestionSource::Ai, false)
                    .await);
            }
            debug!("ai suggestions unavailable, using heuristics");
        }

        Ok(self.run_pipeline(request, prepared, false).await)
    }

    async fn run_pipeline(
        &self,
        request: &SuggestionRequest,
        prepared: Prepared,
        allow_ai: bool,
    ) -> SuggestionResponse {
        if let Some(raw) = self.cache.get(&prepared.key).await {
            match serde_json::from_str::<CachedPool>(&raw) {
                Ok(pool) if !pool.suggestions.is_empty() => {
                    bump(&self.counters.cache_hits);
                    debug!(origin = pool.source.as_str(), "suggestion cache hit");
                    return self
                        .finalize(request, &prepared, pool.suggestions, SuggestionSource::Cache, true)
                        .await;
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "discarding malformed cached suggestions"),
            }
        }
        bump(&self.counters.cache_misses);

        let mut pool = Vec::new();
        let mut source = None;

        if let Some(template) = prepared.template {
            bump(&self.counters.template_hits);
            pool.extend(rotate(template.replies, prepared.seed));
            source = Some(SuggestionSource::Template);
        }

        if pool.len() < prepared.count {
            let contextual = contextual_suggestions(&prepared.analysis, prepared.seed);
            if !contextual.is_empty() {
                bump(&self.counters.contextual_hits);
                pool.extend(contextual);
                source.get_or_insert(SuggestionSource::Contextual);
            }
        }

        let mut pool = dedupe(pool);

        if allow_ai && pool.len() < prepared.count && self.ai_available() {
            if let Some(lines) = self.generate_replies(request, &prepared).await {
                pool.extend(lines);
                pool = dedupe(pool);
                source.get_or_insert(SuggestionSource::Ai);
            }
        }

        let source = match source {
            Some(source) => {
                if pool.len() < prepared.count {
                    pool.extend(rotate(FALLBACK_REPLIES, prepared.seed));
                    pool = dedupe(pool);
                }
                source
            }
            None => {
                bump(&self.counters.fallbacks);
                pool = rotate(FALLBACK_REPLIES, prepared.seed);
                SuggestionSource::Fallback
            }
        };

        if source != SuggestionSource::Fallback {
            let stored = CachedPool {
                suggestions: pool.clone(),
                source,
            };
            match serde_json::to_string(&stored) {
                Ok(json) => self.cache.set(&prepared.key, &json, self.ttl).await,
                Err(error) => warn!(%error, "failed to encode suggestion pool"),
            }
        }

        debug!(
            source = source.as_str(),
            category = %prepared.analysis.category,
            candidates = pool.len(),
            "built suggestion pool"
        );

        self.finalize(request, &prepared, pool, source, false).await
    }

    /// Drops replies the user saw recently (unless nothing would be left),
    /// trims to the requested count and records what was issued.
    async fn finalize(
        &self,
        request: &SuggestionRequest,
        prepared: &Prepared,
        pool: Vec<String>,
        source: SuggestionSource,
        cached: bool,
    ) -> SuggestionResponse {
        let user = request.user_id.as_deref().filter(|user| !user.is_empty());

        let recent = match user {
            Some(user) => self.recent(user).await,
            None => Vec::new(),
        };
        let seen: HashSet<String> = recent.iter().map(|item| fold(item)).collect();

        let fresh: Vec<String> = pool
            .iter()
            .filter(|item| !seen.contains(&fold(item)))
            .cloned()
            .collect();
        let mut suggestions = if fresh.is_empty() { pool } else { fresh };
        suggestions.truncate(prepared.count);

        if let Some(user) = user {
            self.remember(user, recent, &suggestions).await;
        }

        SuggestionResponse {
            suggestions,
            source,
            cached,
            analysis: prepared.analysis.clone(),
        }
    }

    async fn recent(&self, user: &str) -> Vec<String> {
        let Some(raw) = self.recent.get(&recent_key(user)).await else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    async fn remember(&self, user: &str, mut recent: Vec<String>, issued: &[String]) {
        if self.config.recent_limit == 0 || issued.is_empty() {
            return;
        }

        let issued_folded: HashSet<String> = issued.iter().map(|item| fold(item)).collect();
        recent.retain(|item| !issued_folded.contains(&fold(item)));
        recent.extend(issued.iter().cloned());
        if recent.len() > self.config.recent_limit {
            let excess = recent.len() - self.config.recent_limit;
            recent.drain(..excess);
        }

        match serde_json::to_string(&recent) {
            Ok(json) => {
                let ttl = Duration::from_secs(self.config.recent_ttl_seconds.max(1));
                self.recent.set(&recent_key(user), &json, ttl).await;
            }
            Err(error) => warn!(%error, "failed to encode recent suggestions"),
        }
    }

    /// Asks the generator for replies. `None` when it fails or returns
    /// nothing usable.
    async fn generate_replies(
        &self,
        request: &SuggestionRequest,
        prepared: &Prepared,
    ) -> Option<Vec<String>> {
        let generator = self.generator.as_ref()?;
        bump(&self.counters.ai_requests);

        let limit = self.config.max_message_chars;
        let window = self.config.context_window;
        let start = request.context.len().saturating_sub(window);
        let mut prompt = String::new();
        if start < request.context.len() {
            prompt.push_str("Conversation so far:\n");
            for line in &request.context[start..] {
                let sender = line.sender.as_deref().unwrap_or("them");
                let sender = clip(sender.trim(), MAX_SENDER_CHARS);
                prompt.push_str(&format!("{sender}: {}\n", clip(line.content.trim(), limit)));
            }
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "Message to reply to: {}",
            clip(request.message.trim(), limit)
        ));

        let generation = GenerationRequest::new(prompt).with_system(format!(
            "You suggest quick replies for a team chat app. Write {} short, distinct replies \
             the user could send next, one per line, without numbering or quotes.",
            prepared.count
        ));

        match generator.generate(generation).await {
            Ok(text) => {
                let lines = dedupe(parse_ai_lines(&text));
                if lines.is_empty() {
                    bump(&self.counters.ai_failures);
                    warn!(provider = generator.name(), "text generator returned no usable replies");
                    None
                } else {
                    Some(lines)
                }
            }
            Err(error) => {
                bump(&self.counters.ai_failures);
                warn!(provider = generator.name(), %error, "text generation failed");
                None
            }
        }
    }

    /// Rewrites `text` in the requested tone, falling back to a local tidy-up
    /// when no generator is usable.
    pub async fn improve(&self, text: &str, tone: Tone) -> Result<ImprovedMessage, SuggestionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SuggestionError::EmptyMessage);
        }
        if trimmed.chars().count() > MAX_IMPROVE_CHARS {
            return Err(SuggestionError::MessageTooLong {
                max: MAX_IMPROVE_CHARS,
            });
        }

        if let Some(generator) = self.generator.as_ref().filter(|_| self.config.ai_enabled) {
            bump(&self.counters.ai_requests);
            let request = GenerationRequest::new(trimmed).with_system(format!(
                "Rewrite the user's chat message in a {tone} tone. Keep the meaning and \
                 language. Reply with the rewritten message only."
            ));

            match generator.generate(request).await {
                Ok(rewritten) => {
                    let rewritten = strip_quotes(rewritten.trim()).trim().to_string();
                    if !rewritten.is_empty() {
                        return Ok(ImprovedMessage {
                            original: text.to_string(),
                            improved: rewritten,
                            tone,
                            source: SuggestionSource::Ai,
                        });
                    }
                    bump(&self.counters.ai_failures);
                }
                Err(error) => {
                    bump(&self.counters.ai_failures);
                    warn!(provider = generator.name(), %error, "message rewrite failed");
                }
            }
        }

        Ok(ImprovedMessage {
            original: text.to_string(),
            improved: tidy(trimmed, tone),
            tone,
            source: SuggestionSource::Fallback,
        })
    }

    pub fn stats(&self) -> SuggestionStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let cache_hits = load(&self.counters.cache_hits);
        let cache_misses = load(&self.counters.cache_misses);
        let lookups = cache_hits + cache_misses;

        SuggestionStats {
            requests: load(&self.counters.requests),
            cache_hits,
            cache_misses,
            template_hits: load(&self.counters.template_hits),
            contextual_hits: load(&self.counters.contextual_hits),
            ai_requests: load(&self.counters.ai_requests),
            ai_failures: load(&self.counters.ai_failures),
            fallbacks: load(&self.counters.fallbacks),
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
            memory_entries: self.cache.memory_len() + self.recent.memory_len(),
            redis_enabled: self.cache.redis_enabled(),
        }
    }

    /// Drops cached pools and recent-suggestion lists from every tier.
    pub async fn clear_cache(&self) -> u64 {
        let removed =
            self.cache.clear(CLEAR_PREFIX).await + self.recent.clear(RECENT_KEY_PREFIX).await;
        info!(removed, "cleared suggestion cache");
        removed
    }
}

fn recent_key(user: &str) -> String {
    format!("{RECENT_KEY_PREFIX}{user}")
}

/// Case folding used for every reply comparison.
fn fold(item: &str) -> String {
    item.trim().to_lowercase()
}

/// Order-preserving, case-insensitive de-duplication that also drops blanks.
fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(fold(item)))
        .collect()
}

/// First `max` characters of `text`.
fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn strip_quotes(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '"' | '\u{201c}' | '\u{201d}'))
}

fn strip_list_marker(line: &str) -> &str {
    let line = line
        .trim_start_matches(|c| matches!(c, '-' | '*' | '\u{2022}'))
        .trim_start();
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < line.len() {
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if after.starts_with(char::is_whitespace) {
                return after.trim_start();
            }
        }
    }
    line
}

/// One reply per line, with list markers and wrapping quotes removed.
fn parse_ai_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_quotes(strip_list_marker(line.trim())).trim())
        .filter(|line| !line.is_empty() && line.chars().count() <= MAX_AI_LINE_CHARS)
        .map(str::to_string)
        .collect()
}

fn capitalize_pronoun(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower == "i" || lower.starts_with("i'") {
        let mut chars = word.chars();
        chars.next();
        format!("I{}", chars.as_str())
    } else {
        word.to_string()
    }
}

/// Local rewrite: collapses whitespace, applies a few tone-specific word
/// substitutions, capitalizes and ensures terminal punctuation.
fn tidy(text: &str, tone: Tone) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let lower = word.to_lowercase();
        match tone {
            Tone::Concise if FILLER_WORDS.contains(&lower.as_str()) => continue,
            Tone::Formal => {
                if let Some((_, expanded)) = FORMAL_EXPANSIONS
                    .iter()
                    .find(|(contraction, _)| *contraction == lower)
                {
                    words.push(expanded.to_string());
                    continue;
                }
            }
            _ => {}
        }
        words.push(capitalize_pronoun(word));
    }

    if words.is_empty() {
        words = text.split_whitespace().map(str::to_string).collect();
    }

    let mut sentence = words.join(" ");
    if let Some(first) = sentence.chars().next() {
        let upper: String = first.to_uppercase().collect();
        sentence.replace_range(..first.len_utf8(), &upper);
    }

    match sentence.chars().last() {
        Some('.') if tone == Tone::Friendly && !sentence.ends_with("..") => {
            sentence.pop();
            sentence.push('!');
        }
        Some('.' | '!' | '?' | '\u{2026}') => {}
        Some(_) => sentence.push(if tone == Tone::Friendly { '!' } else { '.' }),
        None => {}
    }

    sentence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SuggestionService {
        SuggestionService::new(
            SuggestionConfig::default(),
            &CacheConfig::default(),
            TieredCache::memory_only(64),
        )
    }

    #[test]
    fn parse_ai_lines_strips_markers_and_quotes() {
        let lines = parse_ai_lines(
            "1. Sounds great!\n- \"See you there\"\n\n2) On my way\n3.5 hours is fine\n* \u{201c}Sure\u{201d}",
        );
        assert_eq!(
            lines,
            vec![
                "Sounds great!",
                "See you there",
                "On my way",
                "3.5 hours is fine",
                "Sure"
            ]
        );
    }

    #[test]
    fn parse_ai_lines_drops_overlong_lines() {
        let long = "a".repeat(MAX_AI_LINE_CHARS + 1);
        assert!(parse_ai_lines(&long).is_empty());
    }

    #[test]
    fn dedupe_is_case_insensitive_and_ordered() {
        let items = vec!["Okay!".into(), " okay! ".into(), "".into(), "Sure".into()];
        assert_eq!(dedupe(items), vec!["Okay!", "Sure"]);
    }

    #[test]
    fn tidy_applies_tone() {
        assert_eq!(tidy("  hello   there  ", Tone::Friendly), "Hello there!");
        assert_eq!(tidy("see you soon.", Tone::Friendly), "See you soon!");
        assert_eq!(tidy("i can't make it", Tone::Formal), "I cannot make it.");
        assert_eq!(
            tidy("i just really wanted to say thanks", Tone::Concise),
            "I wanted to say thanks."
        );
        assert_eq!(tidy("done?", Tone::Concise), "Done?");
        assert_eq!(tidy("just", Tone::Concise), "Just.");
    }

    #[tokio::test]
    async fn improve_validates_input() {
        let service = service();
        assert!(matches!(
            service.improve("   ", Tone::Formal).await,
            Err(SuggestionError::EmptyMessage)
        ));
        let long = "x".repeat(MAX_IMPROVE_CHARS + 1);
        assert!(matches!(
            service.improve(&long, Tone::Formal).await,
            Err(SuggestionError::MessageTooLong { max }) if max == MAX_IMPROVE_CHARS
        ));
    }

    #[tokio::test]
    async fn improve_without_generator_uses_tidy() {
        let improved = service().improve("thanks for the help", Tone::Friendly).await.unwrap();
        assert_eq!(improved.improved, "Thanks for the help!");
        assert_eq!(improved.source, SuggestionSource::Fallback);
        assert_eq!(improved.original, "thanks for the help");
    }

    #[test]
    fn clip_counts_characters() {
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("hi", 5), "hi");
        assert_eq!(clip("", 3), "");
    }

    #[tokio::test]
    async fn recent_lists_fold_case_beyond_ascii() {
        let service = service();
        service
            .remember("u1", vec!["ÇA MARCHE !".to_string()], &["ça marche !".to_string()])
            .await;

        assert_eq!(service.recent("u1").await, vec!["ça marche !"]);
    }

    #[tokio::test]
    async fn recent_lists_survive_a_full_pool_cache() {
        let service = SuggestionService::new(
            SuggestionConfig::default(),
            &CacheConfig::default(),
            TieredCache::memory_only(2),
        );
        service.remember("u1", Vec::new(), &["Okay!".to_string()]).await;

        for key in ["suggestions:v1:a", "suggestions:v1:b", "suggestions:v1:c"] {
            service.cache.set(key, "{}", Duration::from_secs(3600)).await;
        }

        assert_eq!(service.recent("u1").await, vec!["Okay!"]);
    }

    #[tokio::test]
    async fn count_is_clamped_to_configured_bounds() {
        let service = service();
        let many = service
            .suggest(&SuggestionRequest::new("hello").with_count(50))
            .await
            .unwrap();
        assert!(many.suggestions.len() <= SuggestionConfig::default().max_count);

        let none = service
            .suggest(&SuggestionRequest::new("hello").with_count(0))
            .await
            .unwrap();
        assert_eq!(none.suggestions.len(), 1);
    }
}
