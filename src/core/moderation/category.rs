// Best-guess story category from keywords, used when the submitter didn't pick one.

use crate::core::stories::StoryCategory;

/// Keyword table, checked top to bottom. First category with a hit wins.
const CATEGORY_KEYWORDS: &[(StoryCategory, &[&str])] = &[
    (
        StoryCategory::Sms,
        &["sms", "text message", "texted", "whatsapp"],
    ),
    (
        StoryCategory::Phone,
        &["phone", "call", "called", "caller", "voicemail"],
    ),
    (
        StoryCategory::Email,
        &["email", "emails", "e-mail", "inbox", "phishing"],
    ),
    (
        StoryCategory::Investment,
        &[
            "invest",
            "invested",
            "investing",
            "investment",
            "crypto",
            "bitcoin",
            "trading",
            "returns",
        ],
    ),
    (
        StoryCategory::Social,
        &[
            "facebook",
            "instagram",
            "tiktok",
            "social media",
            "dating",
        ],
    ),
    (
        StoryCategory::Shopping,
        &[
            "shop",
            "shopping",
            "order",
            "ordered",
            "delivery",
            "parcel",
            "marketplace",
        ],
    ),
];

/// Guess a category for `text`. Keywords match whole words only, so "recall"
/// doesn't count as a phone scam.
pub fn guess_category(text: &str) -> StoryCategory {
    let words = tokenize(text);

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_phrase(&words, k)))
        .map(|(category, _)| *category)
        .unwrap_or(StoryCategory::Other)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }

    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}
