use crate::core::stories::{
    Comment, ModerationStatus, Story, StoryError, StoryListing, StoryStore,
};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// JSON-based story store. Everything lives in one document:
/// { stories: [Story], comments: [Comment] }, both in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoryDocument {
    stories: Vec<Story>,
    comments: Vec<Comment>,
}

/// The file is the only source of truth, so several processes can share it.
///
/// Every mutation takes an exclusive lock on a sibling `.lock` file, re-reads
/// the document, applies the change and writes it back through a temp file
/// and rename. Reads take a shared lock. A failed write leaves the previous
/// file in place.
pub struct JsonStoryStore {
    path: PathBuf,
    lock_path: PathBuf,
    /// Serializes writers within this process so they don't park blocking threads
    writer: Mutex<()>,
}

impl JsonStoryStore {
    /// Open the store at `path`. A missing file starts an empty store; a file
    /// that isn't a story document is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoryError> {
        let path = path.into();
        let store = Self {
            lock_path: sibling_path(&path, ".lock"),
            path,
            writer: Mutex::new(()),
        };

        store.read().await?;
        Ok(store)
    }

    /// Current document from disk, under a shared lock.
    async fn read(&self) -> Result<StoryDocument, StoryError> {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || {
            let _lock = lock_file(&lock_path, false)?;
            load_document(&path)
        })
        .await
        .map_err(storage_err)?
    }

    /// Apply `change` to the latest document under the exclusive lock. The
    /// closure returns its result plus whether anything changed (no write
    /// happens otherwise).
    async fn mutate<T, F>(&self, change: F) -> Result<T, StoryError>
    where
        F: FnOnce(&mut StoryDocument) -> (T, bool) + Send + 'static,
        T: Send + 'static,
    {
        let _writer = self.writer.lock().await;
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || {
            let _lock = lock_file(&lock_path, true)?;
            let mut document = load_document(&path)?;
            let (result, changed) = change(&mut document);
            if changed {
                write_document(&path, &document)?;
            }
            Ok(result)
        })
        .await
        .map_err(storage_err)?
    }
}

fn storage_err(e: impl std::fmt::Display) -> StoryError {
    StoryError::StorageError(e.to_string())
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<(), StoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(storage_err)?;
    }
    Ok(())
}

/// Open the lock file and hold a shared or exclusive lock until it is dropped.
fn lock_file(lock_path: &Path, exclusive: bool) -> Result<File, StoryError> {
    ensure_parent(lock_path)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(storage_err)?;

    if exclusive {
        file.lock_exclusive().map_err(storage_err)?;
    } else {
        file.lock_shared().map_err(storage_err)?;
    }
    Ok(file)
}

fn load_document(path: &Path) -> Result<StoryDocument, StoryError> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            StoryError::StorageError(format!("Corrupt story file {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoryDocument::default()),
        Err(e) => Err(storage_err(e)),
    }
}

/// Write to a sibling temp file, then rename over the real one.
fn write_document(path: &Path, document: &StoryDocument) -> Result<(), StoryError> {
    ensure_parent(path)?;
    let bytes = serde_json::to_vec_pretty(document).map_err(storage_err)?;
    let tmp = sibling_path(path, ".tmp");
    std::fs::write(&tmp, bytes).map_err(storage_err)?;
    std::fs::rename(&tmp, path).map_err(storage_err)?;
    Ok(())
}

#[async_trait]
impl StoryStore for JsonStoryStore {
    async fn insert_story(&self, story: &Story) -> Result<(), StoryError> {
        let story = story.clone();
        self.mutate(move |doc| {
            doc.stories.push(story);
            ((), true)
        })
        .await
    }

    async fn get_story(&self, id: Uuid) -> Result<Option<Story>, StoryError> {
        let document = self.read().await?;
        Ok(document.stories.into_iter().find(|s| s.id == id))
    }

    async fn list_approved(&self, limit: usize) -> Result<Vec<StoryListing>, StoryError> {
        let document = self.read().await?;

        // Reverse insertion order first so equal timestamps stay newest-first
        let mut listings: Vec<StoryListing> = document
            .stories
            .iter()
            .rev()
            .filter(|s| s.moderation_status == ModerationStatus::Approved)
            .map(|s| StoryListing {
                comment_count: document
                    .comments
                    .iter()
                    .filter(|c| c.story_id == s.id)
                    .count() as u32,
                story: s.clone(),
            })
            .collect();

        listings.sort_by(|a, b| b.story.created_at.cmp(&a.story.created_at));
        listings.truncate(limit);
        Ok(listings)
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Story>, StoryError> {
        let document = self.read().await?;
        let mut pending: Vec<Story> = document
            .stories
            .into_iter()
            .filter(|s| s.moderation_status == ModerationStatus::Pending)
            .collect();

        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn transition_pending(
        &self,
        id: Uuid,
        to: ModerationStatus,
    ) -> Result<bool, StoryError> {
        self.mutate(move |doc| {
            match doc
                .stories
                .iter_mut()
                .find(|s| s.id == id && s.moderation_status == ModerationStatus::Pending)
            {
                Some(story) => {
                    story.moderation_status = to;
                    (true, true)
                }
                None => (false, false),
            }
        })
        .await
    }

    async fn increment_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError> {
        self.mutate(move |doc| match doc.stories.iter_mut().find(|s| s.id == id) {
            Some(story) => {
                story.likes = story.likes.saturating_add(1);
                (Some(story.likes), true)
            }
            None => (None, false),
        })
        .await
    }

    async fn decrement_likes(&self, id: Uuid) -> Result<Option<u32>, StoryError> {
        self.mutate(move |doc| match doc.stories.iter_mut().find(|s| s.id == id) {
            Some(story) => {
                let changed = story.likes > 0;
                story.likes = story.likes.saturating_sub(1);
                (Some(story.likes), changed)
            }
            None => (None, false),
        })
        .await
    }

    async fn delete_story(&self, id: Uuid) -> Result<bool, StoryError> {
        self.mutate(move |doc| {
            let before = doc.stories.len();
            doc.stories.retain(|s| s.id != id);
            if doc.stories.len() == before {
                return (false, false);
            }
            doc.comments.retain(|c| c.story_id != id);
            (true, true)
        })
        .await
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<bool, StoryError> {
        let comment = comment.clone();
        self.mutate(move |doc| {
            if !doc.stories.iter().any(|s| s.id == comment.story_id) {
                return (false, false);
            }
            doc.comments.push(comment);
            (true, true)
        })
        .await
    }

    async fn list_comments(&self, story_id: Uuid) -> Result<Vec<Comment>, StoryError> {
        let document = self.read().await?;
        let mut comments: Vec<Comment> = document
            .comments
            .into_iter()
            .filter(|c| c.story_id == story_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}
