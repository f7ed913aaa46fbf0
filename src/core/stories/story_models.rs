// Story domain models - submitted scam stories, their comments, and the
// moderation status that governs visibility.
//
// These are pure domain types with no storage dependencies.
// The infra layer maps them to rows / JSON documents.

use crate::core::moderation::ModerationReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Category tag for a story (the `type` field on the public site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryCategory {
    Sms,
    Phone,
    Email,
    Investment,
    Social,
    Shopping,
    Other,
}

impl StoryCategory {
    pub const ALL: [StoryCategory; 7] = [
        StoryCategory::Sms,
        StoryCategory::Phone,
        StoryCategory::Email,
        StoryCategory::Investment,
        StoryCategory::Social,
        StoryCategory::Shopping,
        StoryCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryCategory::Sms => "sms",
            StoryCategory::Phone => "phone",
            StoryCategory::Email => "email",
            StoryCategory::Investment => "investment",
            StoryCategory::Social => "social",
            StoryCategory::Shopping => "shopping",
            StoryCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for StoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StoryCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown story category '{}'", s.trim()))
    }
}

/// Moderation status of a story. Only `Approved` stories are publicly visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    /// Waiting in the admin review queue
    Pending,
    /// Visible in the public feed
    Approved,
    /// Hidden for good
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            other => Err(format!("unknown moderation status '{}'", other)),
        }
    }
}

/// A user-submitted account of a scam experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    /// Cleaned (trimmed) text, exactly as shown to readers
    pub text: String,
    pub category: StoryCategory,
    /// Optional region / jurisdiction tag
    pub state: Option<String>,
    pub likes: u32,
    pub moderation_status: ModerationStatus,
    /// Toxicity score the decision was based on, kept for audit
    pub moderation_score: f64,
    pub moderation_reasons: Vec<ModerationReason>,
    pub created_at: DateTime<Utc>,
}

/// A story as it appears in the public feed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryListing {
    pub story: Story,
    pub comment_count: u32,
}

/// A reader comment attached to a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub story_id: Uuid,
    pub text: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What the submitter gets back after a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedStory {
    pub id: Uuid,
    pub moderation_status: ModerationStatus,
}
