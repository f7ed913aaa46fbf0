pub mod json_story_store;
pub mod sqlite_story_store;

pub use json_story_store::JsonStoryStore;
pub use sqlite_story_store::SqliteStoryStore;
