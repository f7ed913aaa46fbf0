// Plain-text rendering of core results for the terminal.

use crate::core::moderation::{ModerationAction, Verdict};
use crate::core::stories::{Comment, CreatedStory, ModerationStatus, Story, StoryError, StoryListing};

/// Longest excerpt shown in list views.
const EXCERPT_CHARS: usize = 120;

pub fn format_created(created: &CreatedStory) -> String {
    let note = match created.moderation_status {
        ModerationStatus::Approved => "published",
        ModerationStatus::Pending => "waiting for review",
        ModerationStatus::Rejected => "rejected",
    };
    format!(
        "Story {} submitted ({}: {})",
        created.id, created.moderation_status, note
    )
}

pub fn format_listing(listings: &[StoryListing]) -> String {
    if listings.is_empty() {
        return "No stories yet.".to_string();
    }

    listings
        .iter()
        .map(|l| {
            format!(
                "{} [{}{}] {} like(s), {} comment(s)\n    {}",
                l.story.id,
                l.story.category,
                l.story
                    .state
                    .as_deref()
                    .map(|s| format!(", {}", s))
                    .unwrap_or_default(),
                l.story.likes,
                l.comment_count,
                excerpt(&l.story.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_pending(stories: &[Story]) -> String {
    if stories.is_empty() {
        return "Review queue is empty.".to_string();
    }

    stories
        .iter()
        .map(|s| {
            format!(
                "{} submitted {} score {:.2} reasons [{}]\n    {}",
                s.id,
                s.created_at.format("%Y-%m-%d %H:%M"),
                s.moderation_score,
                join_reasons(s),
                excerpt(&s.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_story(story: &Story) -> String {
    let mut lines = vec![
        format!("Story {}", story.id),
        format!("Status:   {}", story.moderation_status),
        format!("Score:    {:.2}", story.moderation_score),
        format!("Reasons:  [{}]", join_reasons(story)),
        format!("Category: {}", story.category),
    ];
    if let Some(state) = &story.state {
        lines.push(format!("State:    {}", state));
    }
    lines.push(format!("Likes:    {}", story.likes));
    lines.push(format!("Created:  {}", story.created_at.to_rfc3339()));
    lines.push(String::new());
    lines.push(story.text.clone());
    lines.join("\n")
}

pub fn format_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments.".to_string();
    }

    comments
        .iter()
        .map(|c| {
            format!(
                "{} {}: {}",
                c.created_at.format("%Y-%m-%d %H:%M"),
                c.author.as_deref().unwrap_or("anonymous"),
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_verdict(verdict: &Verdict) -> String {
    let action = match verdict.action {
        ModerationAction::Allow => "allow",
        ModerationAction::Reject => "reject",
    };
    format!(
        "Action:   {}\nReasons:  [{}]\nScore:    {:.2}\nCategory: {}",
        action,
        verdict.reason_codes(),
        verdict.score,
        verdict.category_guess
    )
}

/// User-facing text for an error; rejections explain themselves.
pub fn format_error(error: &StoryError) -> String {
    match error {
        StoryError::Rejected(verdict) => format!(
            "Your story was not published.\nReasons: {}\nScore: {:.2}",
            verdict.reason_codes(),
            verdict.score
        ),
        other => other.to_string(),
    }
}

fn join_reasons(story: &Story) -> String {
    story
        .moderation_reasons
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::ModerationReason;
    use crate::core::stories::StoryCategory;

    #[test]
    fn test_excerpt_truncates_long_text() {
        let long = "a".repeat(EXCERPT_CHARS + 10);
        let short = excerpt(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), EXCERPT_CHARS + 3);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_rejection_message_lists_reasons() {
        let verdict = Verdict::reject(
            ModerationReason::ToxicContent,
            0.93,
            "whatever".to_string(),
            StoryCategory::Other,
        );
        let message = format_error(&StoryError::Rejected(verdict));
        assert!(message.contains("toxic_content"));
        assert!(message.contains("0.93"));
    }
}
