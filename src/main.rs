// This is the entry point of the ScamSafe story tool.
//
// **Architecture Overview:**
// - `core/` = Business logic (moderation pipeline, story lifecycle)
// - `infra/` = Implementations of core traits (SQLite/JSON stores, toxicity API)
// - `cli/` = Command-line adapter (argument parsing, output)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the requested command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::cli::{formatter, Cli};
use crate::config::{AppConfig, StoryBackend};
use crate::core::moderation::{LexicalValidator, ModerationEngine, ToxicityClassifier};
use crate::core::stories::{StoryService, StoryStore};
use crate::infra::moderation::{DisabledClassifier, PerspectiveClient};
use crate::infra::stories::{JsonStoryStore, SqliteStoryStore};
use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let validator = LexicalValidator::load_or_fail_open(&config.dictionary_path, &config.moderation);

    // No key means no second stage; stories are judged on the lexical gate only.
    let classifier: Box<dyn ToxicityClassifier> = match &config.perspective_api_key {
        Some(key) => Box::new(
            PerspectiveClient::new(
                key.clone(),
                config.perspective_endpoint.clone(),
                config.classifier_timeout,
            )
            .context("Failed to create toxicity client")?,
        ),
        None => {
            tracing::warn!("PERSPECTIVE_API_KEY not set, toxicity classification disabled");
            Box::new(DisabledClassifier)
        }
    };

    tracing::debug!(
        dictionary = validator.has_dictionary(),
        hold_for_review = config.hold_for_review,
        "Moderation pipeline configured"
    );
    let engine = ModerationEngine::new(validator, classifier, &config.moderation);

    let store: Box<dyn StoryStore> = match config.backend {
        StoryBackend::Sqlite => Box::new(
            SqliteStoryStore::connect(&config.database_url)
                .await
                .context("Failed to initialize SQLite story store")?,
        ),
        StoryBackend::Json => Box::new(
            JsonStoryStore::open(&config.json_path)
                .await
                .context("Failed to open JSON story store")?,
        ),
    };

    let service = StoryService::new(store, engine, config.hold_for_review);

    match cli::run(cli.command, &service).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("{}", formatter::format_error(&e));
            std::process::exit(1);
        }
    }
}
