// SQLite-backed story store.
//
// Tables:
// - stories: submitted stories with moderation status / score / reasons
// - comments: reader comments, owned by a story
//
// Status changes and like counters are single conditional UPDATEs so two
// concurrent admin actions or likes can't race. Deleting a story removes its
// comments in the same transaction.

use crate::core::moderation::ModerationReason;
use crate::core::stories::{
    Comment, ModerationStatus, Story, StoryCategory, StoryError, StoryListing, StoryStore,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use uuid::Uuid;

pub struct SqliteStoryStore {
    pool: Pool<Sqlite>,
}

impl SqliteStoryStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and run migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'other',
                state TEXT,
                likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
                moderation_status TEXT NOT NULL DEFAULT 'pending',
                moderation_score REAL NOT NULL DEFAULT 0,
                moderation_reasons TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_stories_status_created
            ON stories(moderation_status, created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                story_id TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                author TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_comments_story_created
            ON comments(story_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl StoryStore for SqliteStoryStore {
    async fn insert_story(&self, story: &Story) -> Result<(), StoryError> {
        let reasons_json =
            serde_json::to_string(&story.moderation_reasons).map_err(storage_err)?;

        sqlx::query(
            r#"
            INSERT INTO stories (
                id, text, category, state, likes,
                moderation_status, moderation_score, moderation_reasons, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(story.id.to_string())
        .bind(&story.text)
        .bind(story.category.as_str())
        .bind(&story.state)
        .bind(story.likes as i64)
        .bind(story.moderation_status.as_str())
        .bind(story.moderation_score)
        .bind(reasons_json)
        .bind(encode_timestamp(&story.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_story(&self, id: Uuid) -> Result<Option<Story>, StoryError> {
        let row = sqlx::query("SELECT * FROM stories WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.as_ref().map(row_to_story).transpose()
    }

    async fn list_approved(&self, limit: usize) -> Result<Vec<StoryListing>, StoryError> {
        let rows = sqlx::query(
            r#"
            SELECT s.*,
                   (SELECT COUNT(*) FROM comments c WHERE c.story_id = s.id) AS comment_count
            FROM stories s
            WHERE s.moderation_status = 'approved'
            ORDER BY s.created_at DESC, s.rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            listings.push(StoryListing {
                story: row_to_story(&row)?,
                comment_count: row.get::<i64, _>("comment_count") as u32,
            });
        }
        Ok(listings)
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Story>, StoryError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM stories
            WHERE moderation_status = 'pending'
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_story).collect()
    }

    async fn transition_pending(
        &self,
        id: Uuid,
        to: ModerationStatus,
    ) -> Result<bool, StoryError> {
        let result = sqlx::query(
            "UPDATE stories SET moderation_status = ? WHERE id = ? AND moderation_status = 'pending'",
        )
        .bind(to.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError> {
        let row = sqlx::query("UPDATE stories SET likes = likes + 1 WHERE id = ? RETURNING likes")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.map(|r| r.get::<i64, _>("likes") as u32))
    }

    async fn decrement_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError> {
        let row = sqlx::query(
            "UPDATE stories SET likes = MAX(likes - 1, 0) WHERE id = ? RETURNING likes",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|r| r.get::<i64, _>("likes") as u32))
    }

    async fn delete_story(&self, id: Uuid) -> Result<bool, StoryError> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        // Children first; any error drops `tx` and rolls both deletes back
        sqlx::query("DELETE FROM comments WHERE story_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(storage_err)?;
            return Ok(false);
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(true)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<bool, StoryError> {
        let story_id = comment.story_id.to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO comments (id, story_id, text, author, created_at)
            SELECT ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM stories WHERE id = ?)
            "#,
        )
        .bind(comment.id.to_string())
        .bind(&story_id)
        .bind(&comment.text)
        .bind(&comment.author)
        .bind(encode_timestamp(&comment.created_at))
        .bind(&story_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, story_id: Uuid) -> Result<Vec<Comment>, StoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, story_id, text, author, created_at
            FROM comments
            WHERE story_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(story_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_comment).collect()
    }
}

fn storage_err(e: impl std::fmt::Display) -> StoryError {
    StoryError::StorageError(e.to_string())
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoryError::StorageError(format!("bad timestamp '{}': {}", raw, e)))
}

fn decode_uuid(raw: &str) -> Result<Uuid, StoryError> {
    Uuid::parse_str(raw).map_err(|e| StoryError::StorageError(format!("bad id '{}': {}", raw, e)))
}

fn row_to_story(row: &SqliteRow) -> Result<Story, StoryError> {
    let id: String = row.get("id");
    let category: String = row.get("category");
    let status: String = row.get("moderation_status");
    let reasons_json: String = row.get("moderation_reasons");
    let created_at: String = row.get("created_at");

    let moderation_reasons: Vec<ModerationReason> =
        serde_json::from_str(&reasons_json).map_err(storage_err)?;

    Ok(Story {
        id: decode_uuid(&id)?,
        text: row.get("text"),
        category: category
            .parse::<StoryCategory>()
            .map_err(StoryError::StorageError)?,
        state: row.get("state"),
        likes: row.get::<i64, _>("likes") as u32,
        moderation_status: status
            .parse::<ModerationStatus>()
            .map_err(StoryError::StorageError)?,
        moderation_score: row.get("moderation_score"),
        moderation_reasons,
        created_at: decode_timestamp(&created_at)?,
    })
}

fn row_to_comment(row: &SqliteRow) -> Result<Comment, StoryError> {
    let id: String = row.get("id");
    let story_id: String = row.get("story_id");
    let created_at: String = row.get("created_at");

    Ok(Comment {
        id: decode_uuid(&id)?,
        story_id: decode_uuid(&story_id)?,
        text: row.get("text"),
        author: row.get("author"),
        created_at: decode_timestamp(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One connection, so every query sees the same in-memory database.
    async fn memory_store() -> SqliteStoryStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStoryStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn story(status: ModerationStatus, seconds_ago: i64) -> Story {
        Story {
            id: Uuid::new_v4(),
            text: "They asked me to pay a release fee in gift cards.".to_string(),
            category: StoryCategory::Phone,
            state: Some("VIC".to_string()),
            likes: 0,
            moderation_status: status,
            moderation_score: 0.12,
            moderation_reasons: if status == ModerationStatus::Approved {
                Vec::new()
            } else {
                vec![ModerationReason::ToxicContent]
            },
            created_at: Utc::now() - chrono::Duration::seconds(seconds_ago),
        }
    }

    fn comment(story_id: Uuid, text: &str) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            story_id,
            text: text.to_string(),
            author: None,
            created_at: Utc::now(),
        }
    }

    async fn comment_rows(store: &SqliteStoryStore, story_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE story_id = ?")
            .bind(story_id.to_string())
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let store = memory_store().await;
        let original = story(ModerationStatus::Pending, 0);
        store.insert_story(&original).await.unwrap();

        let loaded = store.get_story(original.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, original.id);
        assert_eq!(loaded.text, original.text);
        assert_eq!(loaded.state, original.state);
        assert_eq!(loaded.moderation_reasons, vec![ModerationReason::ToxicContent]);
        assert_eq!(
            encode_timestamp(&loaded.created_at),
            encode_timestamp(&original.created_at)
        );

        assert!(store.get_story(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_only_shows_approved_newest_first() {
        let store = memory_store().await;
        let old = story(ModerationStatus::Approved, 300);
        let new = story(ModerationStatus::Approved, 10);
        store.insert_story(&old).await.unwrap();
        store.insert_story(&new).await.unwrap();
        store
            .insert_story(&story(ModerationStatus::Pending, 5))
            .await
            .unwrap();
        store
            .insert_story(&story(ModerationStatus::Rejected, 1))
            .await
            .unwrap();
        store.insert_comment(&comment(old.id, "me too")).await.unwrap();

        let listed = store.list_approved(100).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|l| l.story.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
        assert_eq!(listed[0].comment_count, 0);
        assert_eq!(listed[1].comment_count, 1);

        assert_eq!(store.list_approved(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_queue_is_oldest_first() {
        let store = memory_store().await;
        let first = story(ModerationStatus::Pending, 600);
        let second = story(ModerationStatus::Pending, 60);
        store.insert_story(&second).await.unwrap();
        store.insert_story(&first).await.unwrap();
        store
            .insert_story(&story(ModerationStatus::Approved, 30))
            .await
            .unwrap();

        let pending = store.list_pending(200).await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_transition_only_applies_to_pending() {
        let store = memory_store().await;
        let pending = story(ModerationStatus::Pending, 0);
        store.insert_story(&pending).await.unwrap();

        assert!(store
            .transition_pending(pending.id, ModerationStatus::Approved)
            .await
            .unwrap());
        assert!(!store
            .transition_pending(pending.id, ModerationStatus::Approved)
            .await
            .unwrap());
        assert!(!store
            .transition_pending(pending.id, ModerationStatus::Rejected)
            .await
            .unwrap());

        let loaded = store.get_story(pending.id).await.unwrap().unwrap();
        assert_eq!(loaded.moderation_status, ModerationStatus::Approved);
        assert_eq!(loaded.moderation_score, 0.12);
        assert_eq!(loaded.moderation_reasons, pending.moderation_reasons);
    }

    #[tokio::test]
    async fn test_likes_never_go_negative() {
        let store = memory_store().await;
        let s = story(ModerationStatus::Approved, 0);
        store.insert_story(&s).await.unwrap();

        assert_eq!(store.decrement_likes(s.id).await.unwrap(), Some(0));
        assert_eq!(store.decrement_likes(s.id).await.unwrap(), Some(0));
        assert_eq!(store.increment_likes(s.id).await.unwrap(), Some(1));
        assert_eq!(store.decrement_likes(s.id).await.unwrap(), Some(0));
        assert_eq!(store.increment_likes(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_comments() {
        let store = memory_store().await;
        let s = story(ModerationStatus::Approved, 0);
        store.insert_story(&s).await.unwrap();
        for text in ["one", "two", "three"] {
            assert!(store.insert_comment(&comment(s.id, text)).await.unwrap());
        }
        assert_eq!(comment_rows(&store, s.id).await, 3);

        assert!(store.delete_story(s.id).await.unwrap());
        assert!(store.get_story(s.id).await.unwrap().is_none());
        assert_eq!(comment_rows(&store, s.id).await, 0);

        // Second delete reports not-found rather than failing
        assert!(!store.delete_story(s.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back_comments() {
        let store = memory_store().await;
        let s = story(ModerationStatus::Approved, 0);
        store.insert_story(&s).await.unwrap();
        for text in ["one", "two", "three"] {
            store.insert_comment(&comment(s.id, text)).await.unwrap();
        }

        // Make the story delete fail after the comments are already gone
        sqlx::query(
            r#"
            CREATE TRIGGER block_story_delete BEFORE DELETE ON stories
            BEGIN
                SELECT RAISE(ABORT, 'story delete blocked');
            END;
            "#,
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let result = store.delete_story(s.id).await;
        assert!(matches!(result, Err(StoryError::StorageError(_))));

        assert!(store.get_story(s.id).await.unwrap().is_some());
        assert_eq!(comment_rows(&store, s.id).await, 3);
    }

    #[tokio::test]
    async fn test_comments_need_an_existing_story() {
        let store = memory_store().await;
        assert!(!store
            .insert_comment(&comment(Uuid::new_v4(), "orphan"))
            .await
            .unwrap());

        let s = story(ModerationStatus::Approved, 0);
        store.insert_story(&s).await.unwrap();
        store.insert_comment(&comment(s.id, "first")).await.unwrap();
        store.insert_comment(&comment(s.id, "second")).await.unwrap();

        let comments = store.list_comments(s.id).await.unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
