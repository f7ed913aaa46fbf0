// Core moderation module - decides whether a submitted story is published.

pub mod category;
pub mod lexical;
pub mod moderation_models;
pub mod moderation_service;

pub use lexical::*;
pub use moderation_models::*;
pub use moderation_service::*;
