// Moderation engine - core decision procedure for submitted stories.
//
// Two stages, cheapest first:
// 1. Lexical gate (local, dictionary based)
// 2. Toxicity classifier (external call)
//
// Either stage failing to run (no dictionary, classifier outage) lets the
// submission through. NO HTTP or storage dependencies here.

use super::category::guess_category;
use super::lexical::LexicalValidator;
use super::moderation_models::{ModerationConfig, ModerationReason, ToxicityScores, Verdict};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Dictionary error: {0}")]
    DictionaryError(String),
}

// ============================================================================
// CLASSIFIER TRAIT (PORT)
// ============================================================================

/// External text classifier returning toxicity scores.
///
/// Implementations return `None` for "no signal": the text wasn't worth a
/// call (see [`should_skip_classification`]) or the service failed. They never
/// return an error to the engine.
#[async_trait]
pub trait ToxicityClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Option<ToxicityScores>;
}

// Lets the composition root pick a classifier at runtime.
#[async_trait]
impl ToxicityClassifier for Box<dyn ToxicityClassifier> {
    async fn classify(&self, text: &str) -> Option<ToxicityScores> {
        (**self).classify(text).await
    }
}

/// Shortest text worth sending to the classifier.
pub const MIN_CLASSIFIABLE_CHARS: usize = 5;

/// A run of this many identical characters marks degenerate input.
pub const DEGENERATE_RUN_LEN: usize = 5;

/// Whether a classifier call should be skipped for `text`.
///
/// Empty text, very short text and degenerate repetition ("aaaaaa") are not
/// toxicity in the classifier's sense, so they never cost a request.
pub fn should_skip_classification(text: &str) -> bool {
    let text = text.trim();
    text.chars().count() < MIN_CLASSIFIABLE_CHARS || has_repeated_run(text, DEGENERATE_RUN_LEN)
}

fn has_repeated_run(text: &str, run_len: usize) -> bool {
    let mut previous = None;
    let mut run = 0;

    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= run_len {
            return true;
        }
    }

    false
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Combines the lexical gate and the classifier into one verdict.
pub struct ModerationEngine<C: ToxicityClassifier> {
    validator: LexicalValidator,
    classifier: C,
    toxicity_threshold: f64,
}

impl<C: ToxicityClassifier> ModerationEngine<C> {
    pub fn new(validator: LexicalValidator, classifier: C, config: &ModerationConfig) -> Self {
        Self {
            validator,
            classifier,
            toxicity_threshold: config.toxicity_threshold,
        }
    }

    /// Moderate a raw submission.
    ///
    /// Only ever returns `Allow` or `Reject`. Text that fails the lexical gate
    /// is rejected without calling the classifier.
    pub async fn moderate(&self, raw_text: &str) -> Verdict {
        let clean_text = raw_text.trim().to_string();
        let category_guess = guess_category(&clean_text);

        if !self.validator.is_plausible_sentence(&clean_text) {
            tracing::debug!(chars = clean_text.len(), "Submission failed lexical gate");
            return Verdict::reject(
                ModerationReason::NotSentence,
                0.0,
                clean_text,
                category_guess,
            );
        }

        let mut score = 0.0;
        match self.classifier.classify(&clean_text).await {
            Some(scores) => {
                score = scores.max();
                if score > self.toxicity_threshold {
                    tracing::debug!(score, "Submission rejected as toxic");
                    return Verdict::reject(
                        ModerationReason::ToxicContent,
                        score,
                        clean_text,
                        category_guess,
                    );
                }
            }
            None => {
                tracing::debug!("No classifier signal, skipping toxicity check");
            }
        }

        Verdict::allow(clean_text, score, category_guess)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{Dictionary, ModerationAction};
    use crate::core::stories::StoryCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Classifier returning canned scores and counting calls
    struct FixedClassifier {
        scores: Option<ToxicityScores>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(scores: Option<ToxicityScores>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ToxicityClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Option<ToxicityScores> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.scores
        }
    }

    fn build_engine(scores: Option<ToxicityScores>) -> ModerationEngine<FixedClassifier> {
        let config = ModerationConfig::default();
        let validator = LexicalValidator::new(None, &config);
        ModerationEngine::new(validator, FixedClassifier::new(scores), &config)
    }

    fn scores(toxicity: f64, insult: f64, profanity: f64, threat: f64) -> Option<ToxicityScores> {
        Some(ToxicityScores {
            toxicity,
            insult,
            profanity,
            threat,
        })
    }

    const STORY: &str = "  A caller said my bank account was frozen and asked for a code.  ";

    #[tokio::test]
    async fn test_clean_story_is_allowed() {
        let engine = build_engine(scores(0.1, 0.05, 0.0, 0.0));
        let verdict = engine.moderate(STORY).await;

        assert_eq!(verdict.action, ModerationAction::Allow);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.score, 0.1);
        assert_eq!(verdict.clean_text, STORY.trim());
        assert_eq!(verdict.category_guess, StoryCategory::Phone);
    }

    #[tokio::test]
    async fn test_too_few_words_rejected_without_classifier_call() {
        // Even a maximally toxic score can't turn this into anything but not_sentence
        let engine = build_engine(scores(1.0, 1.0, 1.0, 1.0));
        let verdict = engine.moderate("buy now").await;

        assert_eq!(verdict.action, ModerationAction::Reject);
        assert_eq!(verdict.reasons, vec![ModerationReason::NotSentence]);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(engine.classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_word_ratio_rejected() {
        let config = ModerationConfig::default();
        let validator = LexicalValidator::new(
            Some(Dictionary::from_words(["the", "cat", "sat"])),
            &config,
        );
        let engine = ModerationEngine::new(validator, FixedClassifier::new(None), &config);

        let verdict = engine.moderate("the cat sat on xqzpw mat wobbling").await;
        assert_eq!(verdict.reasons, vec![ModerationReason::NotSentence]);
        assert_eq!(engine.classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_any_single_score_above_threshold_rejects() {
        let engine = build_engine(scores(0.9, 0.1, 0.1, 0.1));
        let verdict = engine.moderate(STORY).await;

        assert_eq!(verdict.action, ModerationAction::Reject);
        assert_eq!(verdict.reasons, vec![ModerationReason::ToxicContent]);
        assert_eq!(verdict.score, 0.9);

        let engine = build_engine(scores(0.0, 0.0, 0.0, 0.81));
        let verdict = engine.moderate(STORY).await;
        assert_eq!(verdict.reasons, vec![ModerationReason::ToxicContent]);
    }

    #[tokio::test]
    async fn test_score_exactly_at_threshold_is_allowed() {
        let engine = build_engine(scores(0.8, 0.0, 0.0, 0.0));
        let verdict = engine.moderate(STORY).await;

        assert_eq!(verdict.action, ModerationAction::Allow);
        assert_eq!(verdict.score, 0.8);
    }

    #[tokio::test]
    async fn test_classifier_outage_fails_open() {
        let engine = build_engine(None);
        let verdict = engine.moderate(STORY).await;

        assert_eq!(verdict.action, ModerationAction::Allow);
        assert_eq!(verdict.score, 0.0);
        assert_eq!(engine.classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_skip_rules() {
        assert!(should_skip_classification(""));
        assert!(should_skip_classification("  hey "));
        assert!(should_skip_classification("this is sooooo bad"));
        assert!(should_skip_classification("!!!!! scam alert"));
        assert!(!should_skip_classification("hello"));
        assert!(!should_skip_classification("the bank called me twice"));
    }
}
