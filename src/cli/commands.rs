// Command definitions and dispatch.
//
// Each subcommand maps onto exactly one StoryService operation, the same way
// the site's HTTP routes do. No moderation logic lives here.

use super::formatter;
use crate::core::moderation::ToxicityClassifier;
use crate::core::stories::{StoryError, StoryService, StoryStore};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scamsafe", about = "Scam story submissions and moderation queue")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a story (runs moderation first)
    Submit {
        text: String,
        /// sms, phone, email, investment, social, shopping or other
        #[arg(long)]
        category: Option<String>,
        /// Region / jurisdiction tag
        #[arg(long)]
        state: Option<String>,
    },
    /// Public feed: approved stories, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Admin review queue, oldest first
    Pending {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one story with its moderation metadata
    Show { id: String },
    /// Approve a pending story
    Approve { id: String },
    /// Reject a pending story
    Reject { id: String },
    Like { id: String },
    Unlike { id: String },
    /// Delete a story and all of its comments
    Delete { id: String },
    /// Comment on a story
    Comment {
        story_id: String,
        text: String,
        #[arg(long)]
        author: Option<String>,
    },
    /// List comments on a story
    Comments { story_id: String },
    /// Dry-run moderation on some text without storing it
    Moderate { text: String },
}

/// Run one command and return what to print.
pub async fn run<S: StoryStore, C: ToxicityClassifier>(
    command: Command,
    service: &StoryService<S, C>,
) -> Result<String, StoryError> {
    let output = match command {
        Command::Submit {
            text,
            category,
            state,
        } => {
            let created = service
                .create_story(&text, category.as_deref(), state.as_deref())
                .await?;
            formatter::format_created(&created)
        }
        Command::List { limit } => formatter::format_listing(&service.list_approved(limit).await?),
        Command::Pending { limit } => formatter::format_pending(&service.list_pending(limit).await?),
        Command::Show { id } => formatter::format_story(&service.get_story(&id).await?),
        Command::Approve { id } => {
            service.approve(&id).await?;
            format!("Story {} approved", id)
        }
        Command::Reject { id } => {
            service.reject(&id).await?;
            format!("Story {} rejected", id)
        }
        Command::Like { id } => format!("{} like(s)", service.like(&id).await?),
        Command::Unlike { id } => format!("{} like(s)", service.unlike(&id).await?),
        Command::Delete { id } => {
            service.delete_story(&id).await?;
            format!("Story {} deleted", id)
        }
        Command::Comment {
            story_id,
            text,
            author,
        } => {
            let comment = service
                .add_comment(&story_id, &text, author.as_deref())
                .await?;
            format!("Comment {} added", comment.id)
        }
        Command::Comments { story_id } => {
            formatter::format_comments(&service.list_comments(&story_id).await?)
        }
        Command::Moderate { text } => formatter::format_verdict(&service.moderate_preview(&text).await),
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{LexicalValidator, ModerationConfig, ModerationEngine};
    use crate::infra::moderation::DisabledClassifier;
    use crate::infra::stories::JsonStoryStore;
    use tempfile::TempDir;

    async fn service(
        dir: &TempDir,
        hold_for_review: bool,
    ) -> StoryService<JsonStoryStore, DisabledClassifier> {
        let config = ModerationConfig::default();
        let engine = ModerationEngine::new(
            LexicalValidator::new(None, &config),
            DisabledClassifier,
            &config,
        );
        let store = JsonStoryStore::open(dir.path().join("stories.json"))
            .await
            .unwrap();
        StoryService::new(store, engine, hold_for_review)
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["scamsafe"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_parse_submit_with_flags() {
        match parse(&["submit", "some text here", "--category", "email", "--state", "QLD"]) {
            Command::Submit {
                text,
                category,
                state,
            } => {
                assert_eq!(text, "some text here");
                assert_eq!(category.as_deref(), Some("email"));
                assert_eq!(state.as_deref(), Some("QLD"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_review_flow_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, true).await;

        let out = run(
            parse(&["submit", "A fake courier texted me a link to pay customs fees."]),
            &service,
        )
        .await
        .unwrap();
        assert!(out.contains("pending"));

        let pending = service.list_pending(None).await.unwrap();
        let id = pending[0].id.to_string();

        assert_eq!(
            run(parse(&["list"]), &service).await.unwrap(),
            "No stories yet."
        );

        run(parse(&["approve", id.as_str()]), &service).await.unwrap();
        let listing = run(parse(&["list"]), &service).await.unwrap();
        assert!(listing.contains(&id));

        let err = run(parse(&["approve", id.as_str()]), &service).await.unwrap_err();
        assert!(matches!(err, StoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejected_submission_reports_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, false).await;

        let err = run(parse(&["submit", "buy now"]), &service)
            .await
            .unwrap_err();
        assert!(formatter::format_error(&err).contains("not_sentence"));
    }

    #[tokio::test]
    async fn test_moderate_is_a_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, false).await;

        let out = run(
            parse(&["moderate", "They called from a blocked number about my tax refund"]),
            &service,
        )
        .await
        .unwrap();
        assert!(out.contains("allow"));
        assert!(out.contains("phone"));
        assert!(service.list_approved(None).await.unwrap().is_empty());
    }
}
