// Story service - submission, visibility and admin review for scam stories.
//
// This service handles:
// - Validating and moderating new submissions
// - Mapping the moderation verdict onto a persisted status
// - Public listing (approved only) and the admin pending queue
// - Guarded status transitions, likes, comments and cascade delete
//
// NO HTTP or database dependencies here - just domain logic over the StoryStore port.

use super::story_models::{
    Comment, CreatedStory, ModerationStatus, Story, StoryCategory, StoryListing,
};
use crate::core::moderation::{ModerationEngine, ModerationReason, ToxicityClassifier, Verdict};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

/// Longest story accepted, in characters (after trimming).
pub const MAX_STORY_CHARS: usize = 5000;
/// Longest comment accepted, in characters (after trimming).
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_AUTHOR_CHARS: usize = 80;
pub const MAX_STATE_CHARS: usize = 64;

/// Cap (and default) for the public feed.
pub const PUBLIC_LIST_LIMIT: usize = 100;
/// Cap (and default) for the admin review queue.
pub const PENDING_LIST_LIMIT: usize = 200;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoryError {
    /// Bad or missing input from the submitter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Moderation refused the story; the verdict says why
    #[error("Story rejected by moderation ({})", .0.reason_codes())]
    Rejected(Verdict),

    /// Unknown id, or a transition on a story that isn't pending
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting stories and their comments.
///
/// Every mutating method must be atomic on its own: status transitions are
/// conditional on the current status, like counters never go below zero, and
/// deleting a story removes its comments in the same transaction.
#[async_trait]
pub trait StoryStore: Send + Sync {
    async fn insert_story(&self, story: &Story) -> Result<(), StoryError>;

    async fn get_story(&self, id: Uuid) -> Result<Option<Story>, StoryError>;

    /// Approved stories, newest first, with comment counts.
    async fn list_approved(&self, limit: usize) -> Result<Vec<StoryListing>, StoryError>;

    /// Pending stories, oldest first.
    async fn list_pending(&self, limit: usize) -> Result<Vec<Story>, StoryError>;

    /// Move a story from `pending` to `to`. Returns false if the story doesn't
    /// exist or isn't pending.
    async fn transition_pending(&self, id: Uuid, to: ModerationStatus)
        -> Result<bool, StoryError>;

    /// Add one like. Returns the new count, or None for an unknown story.
    async fn increment_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError>;

    /// Remove one like, never going below zero. Returns the new count, or None
    /// for an unknown story.
    async fn decrement_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError>;

    /// Delete a story and all of its comments. Returns false if it didn't exist.
    async fn delete_story(&self, id: Uuid) -> Result<bool, StoryError>;

    /// Attach a comment. Returns false if the parent story doesn't exist.
    async fn insert_comment(&self, comment: &Comment) -> Result<bool, StoryError>;

    /// Comments for a story, oldest first.
    async fn list_comments(&self, story_id: Uuid) -> Result<Vec<Comment>, StoryError>;
}

// Blanket implementation so the backend can be chosen at runtime.
#[async_trait]
impl StoryStore for Box<dyn StoryStore> {
    async fn insert_story(&self, story: &Story) -> Result<(), StoryError> {
        (**self).insert_story(story).await
    }

    async fn get_story(&self, id: Uuid) -> Result<Option<Story>, StoryError> {
        (**self).get_story(id).await
    }

    async fn list_approved(&self, limit: usize) -> Result<Vec<StoryListing>, StoryError> {
        (**self).list_approved(limit).await
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Story>, StoryError> {
        (**self).list_pending(limit).await
    }

    async fn transition_pending(
        &self,
        id: Uuid,
        to: ModerationStatus,
    ) -> Result<bool, StoryError> {
        (**self).transition_pending(id, to).await
    }

    async fn increment_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError> {
        (**self).increment_likes(id).await
    }

    async fn decrement_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError> {
        (**self).decrement_likes(id).await
    }

    async fn delete_story(&self, id: Uuid) -> Result<bool, StoryError> {
        (**self).delete_story(id).await
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<bool, StoryError> {
        (**self).insert_comment(comment).await
    }

    async fn list_comments(&self, story_id: Uuid) -> Result<Vec<Comment>, StoryError> {
        (**self).list_comments(story_id).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Story lifecycle service.
pub struct StoryService<S: StoryStore, C: ToxicityClassifier> {
    store: S,
    engine: ModerationEngine<C>,
    /// When set, nothing is auto-approved; accepted stories wait for review
    hold_for_review: bool,
}

impl<S: StoryStore, C: ToxicityClassifier> StoryService<S, C> {
    pub fn new(store: S, engine: ModerationEngine<C>, hold_for_review: bool) -> Self {
        Self {
            store,
            engine,
            hold_for_review,
        }
    }

    /// Status a non-rejected verdict is persisted with.
    ///
    /// The engine only says allow or reject. Anything the caller doesn't
    /// explicitly allow goes to the pending queue.
    fn status_for_accepted(&self) -> ModerationStatus {
        if self.hold_for_review {
            ModerationStatus::Pending
        } else {
            ModerationStatus::Approved
        }
    }

    /// Submit a new story.
    ///
    /// Rejected submissions are refused with [`StoryError::Rejected`] and are
    /// not stored.
    pub async fn create_story(
        &self,
        text: &str,
        category: Option<&str>,
        state: Option<&str>,
    ) -> Result<CreatedStory, StoryError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(StoryError::Validation("story text is required".to_string()));
        }
        check_length("story text", trimmed, MAX_STORY_CHARS)?;

        let category = parse_category(category)?;
        let state = optional_field("state", state, MAX_STATE_CHARS)?;

        let verdict = self.engine.moderate(trimmed).await;
        if verdict.is_rejected() {
            tracing::info!(
                reasons = %verdict.reason_codes(),
                score = verdict.score,
                "Story submission rejected"
            );
            return Err(StoryError::Rejected(verdict));
        }

        let moderation_status = self.status_for_accepted();
        let mut moderation_reasons = verdict.reasons;
        // A held story always says why it is waiting
        if moderation_status == ModerationStatus::Pending {
            moderation_reasons.push(ModerationReason::HeldForReview);
        }

        let story = Story {
            id: Uuid::new_v4(),
            category: category.unwrap_or(verdict.category_guess),
            text: verdict.clean_text,
            state,
            likes: 0,
            moderation_status,
            moderation_score: verdict.score,
            moderation_reasons,
            created_at: Utc::now(),
        };

        self.store.insert_story(&story).await?;

        tracing::info!(
            story_id = %story.id,
            status = %story.moderation_status,
            category = %story.category,
            "Story submitted"
        );

        Ok(CreatedStory {
            id: story.id,
            moderation_status: story.moderation_status,
        })
    }

    /// Run moderation without storing anything.
    pub async fn moderate_preview(&self, text: &str) -> Verdict {
        self.engine.moderate(text).await
    }

    /// Public feed: approved stories only, newest first.
    pub async fn list_approved(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<StoryListing>, StoryError> {
        self.store
            .list_approved(clamp_limit(limit, PUBLIC_LIST_LIMIT))
            .await
    }

    /// Admin review queue: pending stories, oldest first.
    pub async fn list_pending(&self, limit: Option<usize>) -> Result<Vec<Story>, StoryError> {
        self.store
            .list_pending(clamp_limit(limit, PENDING_LIST_LIMIT))
            .await
    }

    /// Full story with moderation metadata (admin view).
    pub async fn get_story(&self, id: &str) -> Result<Story, StoryError> {
        let uuid = parse_id(id)?;
        self.store
            .get_story(uuid)
            .await?
            .ok_or_else(|| not_found("story", id))
    }

    /// Approve a pending story.
    pub async fn approve(&self, id: &str) -> Result<(), StoryError> {
        self.transition(id, ModerationStatus::Approved).await
    }

    /// Reject a pending story.
    pub async fn reject(&self, id: &str) -> Result<(), StoryError> {
        self.transition(id, ModerationStatus::Rejected).await
    }

    async fn transition(&self, id: &str, to: ModerationStatus) -> Result<(), StoryError> {
        let uuid = parse_id(id)?;
        if !self.store.transition_pending(uuid, to).await? {
            return Err(not_found("pending story", id));
        }
        tracing::info!(story_id = %uuid, status = %to, "Pending story reviewed");
        Ok(())
    }

    pub async fn like(&self, id: &str) -> Result<u32, StoryError> {
        let uuid = parse_id(id)?;
        self.store
            .increment_likes(uuid)
            .await?
            .ok_or_else(|| not_found("story", id))
    }

    pub async fn unlike(&self, id: &str) -> Result<u32, StoryError> {
        let uuid = parse_id(id)?;
        self.store
            .decrement_likes(uuid)
            .await?
            .ok_or_else(|| not_found("story", id))
    }

    /// Permanently delete a story and its comments.
    pub async fn delete_story(&self, id: &str) -> Result<(), StoryError> {
        let uuid = parse_id(id)?;
        if !self.store.delete_story(uuid).await? {
            return Err(not_found("story", id));
        }
        tracing::info!(story_id = %uuid, "Story deleted");
        Ok(())
    }

    pub async fn add_comment(
        &self,
        story_id: &str,
        text: &str,
        author: Option<&str>,
    ) -> Result<Comment, StoryError> {
        let story_uuid = parse_id(story_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(StoryError::Validation(
                "comment text is required".to_string(),
            ));
        }
        check_length("comment text", text, MAX_COMMENT_CHARS)?;
        let author = optional_field("author", author, MAX_AUTHOR_CHARS)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            story_id: story_uuid,
            text: text.to_string(),
            author,
            created_at: Utc::now(),
        };

        if !self.store.insert_comment(&comment).await? {
            return Err(not_found("story", story_id));
        }
        Ok(comment)
    }

    /// Comments for a story, oldest first. Unknown stories have no comments.
    pub async fn list_comments(&self, story_id: &str) -> Result<Vec<Comment>, StoryError> {
        match Uuid::parse_str(story_id.trim()) {
            Ok(uuid) => self.store.list_comments(uuid).await,
            Err(_) => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Ids are opaque to callers; anything that isn't a valid id can't name a story.
fn parse_id(id: &str) -> Result<Uuid, StoryError> {
    Uuid::parse_str(id.trim()).map_err(|_| not_found("story", id))
}

fn not_found(what: &str, id: &str) -> StoryError {
    StoryError::NotFound(format!("{} {}", what, id.trim()))
}

fn clamp_limit(limit: Option<usize>, max: usize) -> usize {
    limit.unwrap_or(max).clamp(1, max)
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), StoryError> {
    if value.chars().count() > max {
        return Err(StoryError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Trim an optional text field; blank becomes None.
fn optional_field(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, StoryError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            check_length(field, v, max)?;
            Ok(Some(v.to_string()))
        }
        None => Ok(None),
    }
}

fn parse_category(category: Option<&str>) -> Result<Option<StoryCategory>, StoryError> {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => c
            .parse::<StoryCategory>()
            .map(Some)
            .map_err(StoryError::Validation),
        None => Ok(None),
    }
}

// ============================================================================
// TESTS
// ============================================================================
