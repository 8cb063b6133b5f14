//! Keyword heuristics used when no template matches.

use std::collections::HashMap;

use crate::types::{Domain, MessageAnalysis, Sentiment};

const MAX_KEYWORDS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "but", "by", "can", "could", "did", "do", "does", "for", "from", "get", "got", "had",
    "has", "have", "he", "her", "here", "him", "his", "how", "i", "i'm", "if", "in", "into", "is",
    "it", "it's", "its", "just", "let", "me", "my", "no", "not", "of", "on", "or", "our", "out",
    "she", "so", "some", "that", "the", "their", "them", "then", "there", "they", "this", "to",
    "too", "up", "us", "was", "we", "were", "what", "when", "where", "which", "who", "why",
    "will", "with", "would", "you", "your", "yours", "we're", "you're", "don't", "can't",
];

const DOMAIN_KEYWORDS: &[(Domain, &[&str])] = &[
    (
        Domain::Technical,
        &[
            "bug", "code", "deploy", "deployment", "build", "server", "api", "database", "error",
            "crash", "release", "merge", "branch", "commit", "test", "tests", "pr", "review",
            "backend", "frontend", "docker", "production", "staging", "logs", "rust", "javascript",
        ],
    ),
    (
        Domain::Work,
        &[
            "project", "deadline", "task", "tasks", "report", "client", "manager", "sprint",
            "standup", "presentation", "proposal", "meeting", "team", "office", "roadmap",
            "okr", "quarter", "review", "plan",
        ],
    ),
    (
        Domain::Social,
        &[
            "party", "weekend", "movie", "game", "games", "friends", "hang", "drinks", "birthday",
            "fun", "concert", "tonight", "plans", "coffee",
        ],
    ),
    (
        Domain::Food,
        &[
            "lunch", "dinner", "breakfast", "food", "eat", "eating", "hungry", "pizza", "restaurant",
            "snack", "cook", "cooking", "recipe", "sushi", "burger",
        ],
    ),
    (
        Domain::Travel,
        &[
            "trip", "flight", "travel", "traveling", "hotel", "vacation", "holiday", "airport",
            "train", "visa", "booking", "abroad",
        ],
    ),
    (
        Domain::Health,
        &[
            "sick", "doctor", "headache", "tired", "exhausted", "gym", "workout", "health", "ill",
            "fever", "hospital", "sleep", "rest",
        ],
    ),
    (
        Domain::Finance,
        &[
            "budget", "invoice", "payment", "paid", "pay", "salary", "expense", "expenses", "money",
            "cost", "price", "bank", "refund", "tax",
        ],
    ),
];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "awesome", "amazing", "love", "nice", "happy", "excellent", "fantastic",
    "glad", "excited", "cool", "perfect", "wonderful", "thanks", "fixed", "works", "working",
    "success", "finally", "yay", "fun",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "sad", "angry", "upset", "annoyed", "frustrated",
    "broken", "fail", "failed", "failing", "problem", "issue", "worried", "sick", "tired",
    "crash", "error", "stuck", "late", "sucks", "ugh", "down",
];

const NEGATIONS: &[&str] = &["not", "no", "never", "don't", "isn't", "wasn't", "can't", "won't", "didn't", "doesn't", "aren't"];

const QUESTION_OPENERS: &[&str] = &[
    "what", "when", "where", "who", "why", "how", "which", "is", "are", "do", "does", "did",
    "can", "could", "will", "would", "should", "shall",
];

const URGENT_MARKERS: &[&str] = &[
    "asap", "urgent", "urgently", "immediately", "emergency", "critical", "blocker", "blocking",
    "deadline",
];

fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '?' || c == '\''))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Classifies a normalized message. `template_category` is recorded as the
/// category when a template already matched.
pub fn analyze(normalized: &str, template_category: Option<&str>) -> MessageAnalysis {
    let words = tokens(normalized);

    let mut domain_scores: Vec<(Domain, usize)> = DOMAIN_KEYWORDS
        .iter()
        .map(|(domain, keywords)| {
            let hits = words.iter().filter(|word| keywords.contains(*word)).count();
            (*domain, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();
    // stable sort keeps declaration order for ties
    domain_scores.sort_by(|a, b| b.1.cmp(&a.1));
    let domains: Vec<Domain> = domain_scores.iter().map(|(domain, _)| *domain).collect();

    let category = template_category
        .map(str::to_owned)
        .or_else(|| domains.first().map(|domain| domain.as_str().to_owned()))
        .unwrap_or_else(|| "general".to_string());

    MessageAnalysis {
        category,
        domains,
        sentiment: sentiment(&words),
        is_question: is_question(normalized, &words),
        urgent: is_urgent(normalized, &words),
        keywords: keywords(&words),
    }
}

fn sentiment(words: &[&str]) -> Sentiment {
    let mut score: i32 = 0;
    for (index, word) in words.iter().enumerate() {
        let polarity = if POSITIVE_WORDS.contains(word) {
            1
        } else if NEGATIVE_WORDS.contains(word) {
            -1
        } else {
            continue;
        };

        let negated = words[index.saturating_sub(2)..index]
            .iter()
            .any(|previous| NEGATIONS.contains(previous));
        score += if negated { -polarity } else { polarity };
    }

    match score {
        s if s > 0 => Sentiment::Positive,
        s if s < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

fn is_question(normalized: &str, words: &[&str]) -> bool {
    normalized.contains('?')
        || words
            .first()
            .map(|first| QUESTION_OPENERS.contains(first))
            .unwrap_or(false)
}

fn is_urgent(normalized: &str, words: &[&str]) -> bool {
    normalized.contains("as soon as possible")
        || normalized.contains("right now")
        || normalized.contains("right away")
        || words
            .iter()
            .any(|word| URGENT_MARKERS.contains(word))
}

fn keywords(words: &[&str]) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in words.iter().enumerate() {
        if word.chars().count() < 3 || STOP_WORDS.contains(word) {
            continue;
        }
        counts.entry(*word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word.to_string())
        .collect()
}

fn domain_replies(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Technical => &[
            "Let me take a look at the logs.",
            "Which branch is this on?",
            "I'll check it out and get back to you.",
            "Can you share the error message?",
        ],
        Domain::Work => &[
            "I'll add it to my list.",
            "What's the deadline on this?",
            "Let's go over it in the next sync.",
            "On it, I'll keep you posted.",
        ],
        Domain::Social => &[
            "Sounds like fun, count me in!",
            "I'm in! Who else is coming?",
            "Maybe, let me check my plans.",
        ],
        Domain::Food => &[
            "I'm starving, let's go!",
            "Sounds delicious!",
            "Where should we eat?",
        ],
        Domain::Travel => &[
            "Have a safe trip!",
            "Nice, where are you headed?",
            "Let me know when you land.",
        ],
        Domain::Health => &[
            "Take care of yourself!",
            "Hope you feel better soon.",
            "Get some rest, we've got it covered.",
        ],
        Domain::Finance => &[
            "I'll double check the numbers.",
            "Can you send me the invoice?",
            "Let's review the budget together.",
        ],
    }
}

const QUESTION_REPLIES: &[&str] = &[
    "Good question, let me check.",
    "I'm not sure yet, I'll find out.",
    "I think so, but let me confirm.",
];

const URGENT_REPLIES: &[&str] = &[
    "On it right now!",
    "Looking into it immediately.",
    "I'll drop everything and check.",
];

const POSITIVE_REPLIES: &[&str] = &["That's great to hear!", "Awesome!", "Love that!"];

const NEGATIVE_REPLIES: &[&str] = &[
    "Oh no, sorry to hear that.",
    "That's rough. Anything I can do?",
    "Hang in there!",
];

/// `bank` rotated so it starts at `seed % len`.
pub(crate) fn rotate(bank: &[&str], seed: usize) -> Vec<String> {
    if bank.is_empty() {
        return Vec::new();
    }
    let start = seed % bank.len();
    bank[start..]
        .iter()
        .chain(bank[..start].iter())
        .map(|reply| reply.to_string())
        .collect()
}

/// Replies derived from the analysis, most specific first: urgency, question,
/// domains in score order, then sentiment. Empty when the analysis carries no
/// usable signal.
pub fn contextual_suggestions(analysis: &MessageAnalysis, seed: usize) -> Vec<String> {
    let mut replies = Vec::new();

    if analysis.urgent {
        replies.extend(rotate(URGENT_REPLIES, seed).into_iter().take(1));
    }

    for domain in &analysis.domains {
        replies.extend(rotate(domain_replies(*domain), seed).into_iter().take(2));
    }

    if analysis.is_question && !analysis.domains.is_empty() {
        replies.extend(rotate(QUESTION_REPLIES, seed).into_iter().take(1));
    }

    match analysis.sentiment {
        Sentiment::Positive => replies.extend(rotate(POSITIVE_REPLIES, seed).into_iter().take(1)),
        Sentiment::Negative => replies.extend(rotate(NEGATIVE_REPLIES, seed).into_iter().take(1)),
        Sentiment::Neutral => {}
    }

    if replies.is_empty() && analysis.is_question {
        replies.extend(rotate(QUESTION_REPLIES, seed));
    }

    replies
}
