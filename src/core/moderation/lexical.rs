// Lexical gate - a cheap, local check that submitted text reads like English prose.
//
// Runs before any external call so gibberish, keyword spam and one-word
// submissions never cost a classifier request. Non-English stories score a
// low word-validity ratio and get rejected; that is a known limitation of the
// heuristic.

use super::moderation_models::ModerationConfig;
use super::moderation_service::ModerationError;
use std::collections::HashSet;
use std::path::Path;

/// Read-only wordlist used to judge whether extracted words are real words.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Dictionary {
    /// Build a dictionary from an iterator of words (lowercased on insert).
    pub fn from_words<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Load a wordlist file: one word per line, `#` comments and blank lines ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModerationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModerationError::DictionaryError(format!(
                "Failed to read wordlist {}: {}",
                path.display(),
                e
            ))
        })?;

        let dictionary = Self::from_words(
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#')),
        );

        if dictionary.is_empty() {
            return Err(ModerationError::DictionaryError(format!(
                "Wordlist {} contains no words",
                path.display()
            )));
        }

        Ok(dictionary)
    }

    /// Case-insensitive membership check.
    pub fn is_word_valid(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Decides whether text is plausible prose.
///
/// The dictionary is optional: without one the validator still applies the
/// structural checks but accepts anything that passes them (fail open).
#[derive(Debug, Clone)]
pub struct LexicalValidator {
    dictionary: Option<Dictionary>,
    min_text_chars: usize,
    min_words: usize,
    min_word_len: usize,
    word_validity_threshold: f64,
}

impl LexicalValidator {
    pub fn new(dictionary: Option<Dictionary>, config: &ModerationConfig) -> Self {
        Self {
            dictionary,
            min_text_chars: config.min_text_chars,
            min_words: config.min_words,
            min_word_len: config.min_word_len,
            word_validity_threshold: config.word_validity_threshold,
        }
    }

    /// Load the wordlist at `path`, falling back to no dictionary if it can't be read.
    pub fn load_or_fail_open(path: impl AsRef<Path>, config: &ModerationConfig) -> Self {
        let dictionary = match Dictionary::load(path.as_ref()) {
            Ok(dictionary) => {
                tracing::info!(
                    words = dictionary.len(),
                    path = %path.as_ref().display(),
                    "Loaded moderation wordlist"
                );
                Some(dictionary)
            }
            Err(e) => {
                tracing::warn!(
                    "{}. Lexical gate will accept any structurally valid text.",
                    e
                );
                None
            }
        };

        Self::new(dictionary, config)
    }

    pub fn has_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }

    /// Check whether `text` looks like a real sentence.
    pub fn is_plausible_sentence(&self, text: &str) -> bool {
        let text = text.trim();

        if text.chars().count() < self.min_text_chars {
            return false;
        }
        if !text.chars().any(char::is_whitespace) {
            return false;
        }

        let words = extract_words(text, self.min_word_len);
        if words.len() < self.min_words {
            return false;
        }

        let Some(dictionary) = &self.dictionary else {
            return true;
        };

        let valid = words.iter().filter(|w| dictionary.is_word_valid(w)).count();
        let valid_ratio = valid as f64 / words.len() as f64;

        valid_ratio >= self.word_validity_threshold
    }
}

/// Split text into ASCII alphabetic runs of at least `min_len` letters.
pub fn extract_words(text: &str, min_len: usize) -> Vec<&str> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= min_len)
        .collect()
}
