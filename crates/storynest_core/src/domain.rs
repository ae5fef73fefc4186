//! crates/storynest_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::Page;
use crate::engagement::Engagement;

/// A titled, paginated story with its engagement metadata.
#[derive(Debug, Clone)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub age_group: String,
    /// Web path of the cover image, if one was uploaded or generated.
    pub cover_image: Option<String>,
    /// Ordered page sequence, owned by the story.
    pub content: Vec<Page>,
    pub is_interactive: bool,
    /// Editorially curated flag; surfaces the story on the featured listing.
    pub featured: bool,
    pub read_time_minutes: i32,
    pub read_count: i64,
    /// Net score = likes - dislikes. May be negative.
    pub net_score: i64,
    pub author: Author,
    pub tags: Vec<String>,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public slice of a user attached to stories they wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
}

// Represents a user - used throughout the app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// Caller-supplied data for creating a new story.
#[derive(Debug, Clone)]
pub struct StoryDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub age_group: String,
    pub cover_image: Option<String>,
    pub content: Vec<Page>,
    pub is_interactive: bool,
    pub read_time_minutes: i32,
    /// Tag names; unknown names are created lazily on first use.
    pub tags: Vec<String>,
}

/// Caller-supplied partial update. Only fields that are `Some` are changed.
#[derive(Debug, Clone, Default)]
pub struct StoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub age_group: Option<String>,
    pub cover_image: Option<String>,
    pub is_interactive: Option<bool>,
    pub read_time_minutes: Option<i32>,
}

impl StoryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.age_group.is_none()
            && self.cover_image.is_none()
            && self.is_interactive.is_none()
            && self.read_time_minutes.is_none()
    }
}

/// Conjunction of optional predicates applied by `list_stories`.
#[derive(Debug, Clone, Default)]
pub struct StoryFilter {
    pub category: Option<String>,
    pub age_group: Option<String>,
    /// Case-insensitive substring match against title or description.
    pub search: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    NetScore,
    ReadCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One page of a paginated listing. `total` counts every story matching the
/// filter, before limit/offset are applied.
#[derive(Debug, Clone)]
pub struct StoryListing {
    pub total: i64,
    pub stories: Vec<Story>,
}

/// A structured story draft returned by the AI generation service.
///
/// Image prompts are transient: they exist only between text generation and
/// the (best-effort) image rendering pass, and are cleared afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedStory {
    pub title: String,
    pub description: String,
    pub age_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_prompt: Option<String>,
    pub pages: Vec<GeneratedPage>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}
