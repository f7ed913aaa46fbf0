// Runtime configuration, read once from the environment (and `.env` if present).
//
// **Environment Variables:**
// - `STORY_BACKEND` - `sqlite` (default) or `json`
// - `DATABASE_URL` - SQLite database (default `sqlite://data/scamsafe.db`)
// - `STORY_JSON_PATH` - JSON store file (default `data/stories.json`)
// - `DICTIONARY_PATH` - wordlist for the lexical gate (default `data/words.txt`)
// - `PERSPECTIVE_API_KEY` - toxicity API key; unset disables the classifier
// - `PERSPECTIVE_ENDPOINT` - analyze URL override
// - `CLASSIFIER_TIMEOUT_SECS` - classifier request timeout (default 5)
// - `HOLD_FOR_REVIEW` - `true` sends every accepted story to the pending queue
// - `TOXICITY_THRESHOLD`, `WORD_VALIDITY_THRESHOLD` - moderation cutoffs

use crate::core::moderation::ModerationConfig;
use crate::infra::moderation::DEFAULT_PERSPECTIVE_ENDPOINT;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryBackend {
    Sqlite,
    Json,
}

impl FromStr for StoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoryBackend::Sqlite),
            "json" => Ok(StoryBackend::Json),
            other => Err(format!("unknown STORY_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoryBackend,
    pub database_url: String,
    pub json_path: PathBuf,
    pub dictionary_path: PathBuf,
    pub perspective_api_key: Option<String>,
    pub perspective_endpoint: String,
    pub classifier_timeout: Duration,
    pub hold_for_review: bool,
    pub moderation: ModerationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StoryBackend::Sqlite,
            database_url: "sqlite://data/scamsafe.db".to_string(),
            json_path: PathBuf::from("data/stories.json"),
            dictionary_path: PathBuf::from("data/words.txt"),
            perspective_api_key: None,
            perspective_endpoint: DEFAULT_PERSPECTIVE_ENDPOINT.to_string(),
            classifier_timeout: Duration::from_secs(5),
            hold_for_review: false,
            moderation: ModerationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment, after reading `.env` if there is one.
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys use the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backend = match get("STORY_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.backend,
        };

        let timeout_secs = parse_or(
            "CLASSIFIER_TIMEOUT_SECS",
            get("CLASSIFIER_TIMEOUT_SECS"),
            defaults.classifier_timeout.as_secs(),
        )?;
        // Zero would time out every request and silently disable the classifier
        if timeout_secs == 0 {
            return Err("CLASSIFIER_TIMEOUT_SECS must be at least 1".to_string());
        }

        let hold_for_review = match get("HOLD_FOR_REVIEW") {
            Some(v) => parse_bool("HOLD_FOR_REVIEW", &v)?,
            None => defaults.hold_for_review,
        };

        let moderation = ModerationConfig {
            toxicity_threshold: parse_ratio(
                "TOXICITY_THRESHOLD",
                get("TOXICITY_THRESHOLD"),
                defaults.moderation.toxicity_threshold,
            )?,
            word_validity_threshold: parse_ratio(
                "WORD_VALIDITY_THRESHOLD",
                get("WORD_VALIDITY_THRESHOLD"),
                defaults.moderation.word_validity_threshold,
            )?,
            ..defaults.moderation.clone()
        };

        Ok(Self {
            backend,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            json_path: get("STORY_JSON_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.json_path),
            dictionary_path: get("DICTIONARY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dictionary_path),
            perspective_api_key: get("PERSPECTIVE_API_KEY"),
            perspective_endpoint: get("PERSPECTIVE_ENDPOINT")
                .unwrap_or(defaults.perspective_endpoint),
            classifier_timeout: Duration::from_secs(timeout_secs),
            hold_for_review,
            moderation,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, String> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| format!("invalid value for {}: '{}'", key, v)),
        None => Ok(default),
    }
}

/// Thresholds compare against scores in [0, 1]; NaN would never compare true.
fn parse_ratio(key: &str, value: Option<String>, default: f64) -> Result<f64, String> {
    let ratio: f64 = parse_or(key, value, default)?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(format!("{} must be between 0 and 1, got {}", key, ratio));
    }
    Ok(ratio)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("invalid value for {}: '{}'", key, value)),
    }
}
