//! Canned replies for common conversational moves.
//!
//! Templates are tried in order against the normalized message and the first
//! match wins, so narrow patterns sit before broad ones.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateMatch {
    pub category: &'static str,
    pub replies: &'static [&'static str],
}

struct Template {
    category: &'static str,
    pattern: &'static str,
    replies: &'static [&'static str],
}

const TEMPLATES: &[Template] = &[
    Template {
        category: "greeting",
        pattern: r"^(hi|hello|hey|heya|hiya|yo|howdy|greetings|good (morning|afternoon|evening))( there| all| everyone| team| guys| folks)?( [a-z]+)?$",
        replies: &[
            "Hey! How's it going?",
            "Hi there! What's up?",
            "Hello! Good to hear from you.",
            "Hey, how can I help?",
        ],
    },
    Template {
        category: "how_are_you",
        pattern: r"\bhow (are|r) (you|u|ya)\b|\bhow's it going\b|\bhow is it going\b|\bhow have you been\b|\bhow's your day\b|\bwhat's up\b|\bwhats up\b|\bsup\b",
        replies: &[
            "Doing well, thanks! How about you?",
            "Pretty good! What's new with you?",
            "All good here. How are things on your end?",
            "Can't complain! How's your day going?",
        ],
    },
    Template {
        category: "gratitude",
        pattern: r"\b(thanks|thank you|thank u|thx|ty|tysm|appreciate it|much appreciated|cheers)\b",
        replies: &[
            "You're welcome!",
            "Anytime!",
            "Happy to help!",
            "No problem at all.",
        ],
    },
    Template {
        category: "apology",
        pattern: r"\b(sorry|apologies|my bad|apologize|apologise|my apologies)\b",
        replies: &[
            "No worries at all!",
            "It's totally fine.",
            "Don't worry about it.",
            "All good, thanks for letting me know.",
        ],
    },
    Template {
        category: "farewell",
        pattern: r"\b(bye|goodbye|bye bye|see you|see ya|cya|good night|gotta go|got to go|ttyl|talk (to you )?later|take care)\b",
        replies: &[
            "See you later!",
            "Bye! Take care.",
            "Talk soon!",
            "Have a good one!",
        ],
    },
    Template {
        category: "congratulations",
        pattern: r"\b(congrats|congratulations|well done|great job|good job|got promoted|got the job|we won|we shipped|we launched)\b",
        replies: &[
            "Thank you so much!",
            "Thanks! Really appreciate it.",
            "That's awesome, congratulations!",
            "Great news, well deserved!",
        ],
    },
    Template {
        category: "scheduling",
        pattern: r"\b(meeting|meet up|schedule|reschedule|calendar|what time|are you (free|available)|free (at|on|tomorrow|today)|available (at|on|tomorrow|today)|sync up|catch up)\b",
        replies: &[
            "Works for me! What time suits you?",
            "Sure, let me check my calendar.",
            "Can we do a bit later?",
            "Sounds good, I'll send an invite.",
        ],
    },
    Template {
        category: "help_request",
        pattern: r"\b(help|assist|stuck|need a hand|any idea|any ideas|how do i|how can i|can you (check|look|review)|could you (check|look|review))\b",
        replies: &[
            "Sure, what do you need?",
            "Happy to help. What's going on?",
            "Let me take a look.",
            "Can you share a few more details?",
        ],
    },
    Template {
        category: "agreement",
        pattern: r"^(ok|okay|k|kk|sure|yes|yep|yeah|yup|sounds good|agreed|deal|alright|all right|cool|got it|noted|perfect)\b",
        replies: &[
            "Great!",
            "Perfect, thanks!",
            "Awesome.",
            "Cool, let's do it.",
        ],
    },
    Template {
        category: "yes_no_question",
        pattern: r"^(is|are|am|do|does|did|can|could|will|would|should|have|has|had|was|were|shall|may)\b.*\?",
        replies: &[
            "Yes, definitely.",
            "I don't think so.",
            "Let me check and get back to you.",
            "Maybe, what do you think?",
        ],
    },
];

static COMPILED: Lazy<Vec<(Regex, &'static Template)>> = Lazy::new(|| {
    TEMPLATES
        .iter()
        .filter_map(|template| {
            Regex::new(template.pattern)
                .ok()
                .map(|regex| (regex, template))
        })
        .collect()
});

/// First template whose pattern matches the normalized message.
pub fn match_template(normalized: &str) -> Option<TemplateMatch> {
    COMPILED
        .iter()
        .find(|(regex, _)| regex.is_match(normalized))
        .map(|(_, template)| TemplateMatch {
            category: template.category,
            replies: template.replies,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(message: &str) -> Option<&'static str> {
        match_template(message).map(|m| m.category)
    }

    #[test]
    fn every_template_pattern_compiles() {
        assert_eq!(COMPILED.len(), TEMPLATES.len());
    }

    #[test]
    fn matches_expected_categories() {
        assert_eq!(category("hey"), Some("greeting"));
        assert_eq!(category("good morning team"), Some("greeting"));
        assert_eq!(category("hi how are you"), Some("how_are_you"));
        assert_eq!(category("thanks a lot"), Some("gratitude"));
        assert_eq!(category("sorry i'm late"), Some("apology"));
        assert_eq!(category("ok gotta go bye"), Some("farewell"));
        assert_eq!(category("congrats on the launch"), Some("congratulations"));
        assert_eq!(category("can we reschedule the meeting"), Some("scheduling"));
        assert_eq!(category("i'm stuck on this bug"), Some("help_request"));
        assert_eq!(category("sounds good to me"), Some("agreement"));
        assert_eq!(category("did the build pass?"), Some("yes_no_question"));
    }

    #[test]
    fn unrelated_messages_do_not_match() {
        assert_eq!(category("the deploy finished at noon"), None);
        assert_eq!(category("thankful"), None);
    }

    #[test]
    fn earlier_templates_take_precedence() {
        // gratitude comes before agreement
        assert_eq!(category("ok thanks"), Some("gratitude"));
    }
}
