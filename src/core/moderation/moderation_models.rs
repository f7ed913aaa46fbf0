// Moderation domain models - verdicts, classifier scores and thresholds.
//
// These are pure domain types with no HTTP or storage dependencies.
// The story service maps a Verdict onto a persisted moderation status.

use crate::core::stories::StoryCategory;
use serde::{Deserialize, Serialize};

/// What the engine decided. The engine itself never produces a "pending"
/// outcome; that status comes from how the caller maps `Allow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Allow,
    Reject,
}

/// Reason code recorded with a moderation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationReason {
    /// Failed the lexical gate (gibberish, keyword spam, fragments)
    NotSentence,
    /// One of the classifier scores exceeded the toxicity threshold
    ToxicContent,
    /// Passed both stages but was queued for a human decision
    HeldForReview,
}

impl ModerationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationReason::NotSentence => "not_sentence",
            ModerationReason::ToxicContent => "toxic_content",
            ModerationReason::HeldForReview => "held_for_review",
        }
    }
}

impl std::fmt::Display for ModerationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores returned by the external classifier, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToxicityScores {
    pub toxicity: f64,
    pub insult: f64,
    pub profanity: f64,
    pub threat: f64,
}

impl ToxicityScores {
    /// Highest of the four scores.
    pub fn max(&self) -> f64 {
        self.toxicity
            .max(self.insult)
            .max(self.profanity)
            .max(self.threat)
    }
}

/// Final outcome of moderating one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub action: ModerationAction,
    pub reasons: Vec<ModerationReason>,
    pub score: f64,
    /// Trimmed text; this is what gets stored and displayed
    pub clean_text: String,
    pub category_guess: StoryCategory,
}

impl Verdict {
    /// Create an "allow" verdict
    pub fn allow(clean_text: String, score: f64, category_guess: StoryCategory) -> Self {
        Self {
            action: ModerationAction::Allow,
            reasons: Vec::new(),
            score,
            clean_text,
            category_guess,
        }
    }

    /// Create a "reject" verdict with a single reason
    pub fn reject(
        reason: ModerationReason,
        score: f64,
        clean_text: String,
        category_guess: StoryCategory,
    ) -> Self {
        Self {
            action: ModerationAction::Reject,
            reasons: vec![reason],
            score,
            clean_text,
            category_guess,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.action == ModerationAction::Reject
    }

    /// Reason codes joined for display, e.g. `not_sentence`.
    pub fn reason_codes(&self) -> String {
        self.reasons
            .iter()
            .map(ModerationReason::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Thresholds for the moderation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationConfig {
    /// Minimum trimmed length (in characters) for the lexical gate
    pub min_text_chars: usize,
    /// Minimum number of words the lexical gate requires
    pub min_words: usize,
    /// Minimum length of an alphabetic run to count as a word
    pub min_word_len: usize,
    /// Share of dictionary words needed to pass (inclusive)
    pub word_validity_threshold: f64,
    /// Any single classifier score above this rejects (exclusive)
    pub toxicity_threshold: f64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 10,
            min_words: 3,
            min_word_len: 2,
            word_validity_threshold: 0.6,
            toxicity_threshold: 0.8,
        }
    }
}
