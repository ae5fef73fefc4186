//! crates/storynest_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::content::ContentFormatError;
use crate::domain::{
    GeneratedStory, SortDirection, SortKey, Story, StoryDraft, StoryFilter,
    StoryListing, StoryPatch, User, UserCredentials,
};
use crate::engagement::Vote;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A persisted content blob failed validation. Surfaced as a server-side
    /// data error and logged; never silently repaired.
    #[error("Malformed story content: {0}")]
    Corrupt(#[from] ContentFormatError),
    /// The upstream AI service failed or returned an unusable structure.
    #[error("External service error: {0}")]
    External(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Persists a new story, resolving each tag name to an existing tag or
    /// lazily creating one, all inside a single transaction.
    async fn create_story(&self, author_id: Uuid, draft: StoryDraft) -> PortResult<Story>;

    async fn get_story(&self, story_id: Uuid) -> PortResult<Story>;

    /// Applies the fields present in `patch`. Fails with `Forbidden` when
    /// `author_id` is not the story's author.
    async fn update_story(
        &self,
        story_id: Uuid,
        author_id: Uuid,
        patch: StoryPatch,
    ) -> PortResult<Story>;

    /// Author-only. Cascades removal of like/dislike and tag join rows.
    async fn delete_story(&self, story_id: Uuid, author_id: Uuid) -> PortResult<()>;

    /// Filtered, sorted, paginated listing. The returned total counts every
    /// story matching the filter, before limit/offset.
    async fn list_stories(
        &self,
        filter: StoryFilter,
        sort_key: SortKey,
        direction: SortDirection,
        limit: i64,
        offset: i64,
    ) -> PortResult<StoryListing>;

    /// Increments the read counter by exactly one, atomically even under
    /// concurrent invocations, and returns the refreshed story.
    async fn record_read(&self, story_id: Uuid) -> PortResult<Story>;

    /// Applies a like/dislike toggle for `user_id` in a single transaction
    /// and returns the refreshed story with its recomputed net score.
    async fn apply_vote(&self, story_id: Uuid, user_id: Uuid, vote: Vote) -> PortResult<Story>;

    /// Author-only replacement of the cover image reference.
    async fn set_cover_image(
        &self,
        story_id: Uuid,
        author_id: Uuid,
        image_path: &str,
    ) -> PortResult<Story>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the user id the session belongs to, rejecting unknown or
    /// expired sessions with `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait StoryGenerationService: Send + Sync {
    /// Generates a structured story draft from a user prompt and category.
    async fn generate_story(&self, user_prompt: &str, category: &str)
        -> PortResult<GeneratedStory>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Renders one illustration for the given prompt, returning encoded image
    /// bytes. Callers treat failure as best-effort: a page without an image
    /// is a valid terminal outcome.
    async fn render_image(&self, prompt: &str) -> PortResult<Vec<u8>>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists uploaded image bytes under a fresh name, rejecting filenames
    /// whose extension is outside the allow-list, and returns the stored
    /// reference used to serve the bytes later.
    async fn save_image(&self, bytes: &[u8], declared_filename: &str) -> PortResult<String>;
}
