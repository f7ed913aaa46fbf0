// Core stories module - story lifecycle and visibility rules.
// Following the same pattern as the moderation module.

pub mod story_models;
pub mod story_service;

pub use story_models::*;
pub use story_service::*;
