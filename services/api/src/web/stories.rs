//! services/api/src/web/stories.rs
//!
//! Contains the Axum handlers for the story REST endpoints: listings,
//! detail reads, create/update/delete, like/dislike voting, and cover
//! image upload.

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storynest_core::content::{deserialize_pages, Page};
use storynest_core::domain::{
    SortDirection, SortKey, Story, StoryDraft, StoryFilter, StoryPatch,
};
use storynest_core::engagement::Vote;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::port_error;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One page of story content as it appears on the wire.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<Page> for PageBody {
    fn from(page: Page) -> Self {
        Self {
            text: page.text,
            image: page.image,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthorBody {
    pub id: Uuid,
    pub username: String,
}

/// The listing shape: everything needed for a story card, without content.
#[derive(Serialize, ToSchema)]
pub struct StorySummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub age_group: String,
    pub cover_image: Option<String>,
    pub featured: bool,
    pub net_score: i64,
    pub read_count: i64,
    pub author: AuthorBody,
    pub created_at: DateTime<Utc>,
}

impl From<Story> for StorySummary {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            title: story.title,
            description: story.description,
            category: story.category,
            age_group: story.age_group,
            cover_image: story.cover_image,
            featured: story.featured,
            net_score: story.net_score,
            read_count: story.read_count,
            author: AuthorBody {
                id: story.author.id,
                username: story.author.username,
            },
            created_at: story.created_at,
        }
    }
}

/// The full story shape returned by detail reads and every mutation.
#[derive(Serialize, ToSchema)]
pub struct StoryDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub age_group: String,
    pub cover_image: Option<String>,
    pub content: Vec<PageBody>,
    pub is_interactive: bool,
    pub featured: bool,
    pub read_time_minutes: i32,
    pub read_count: i64,
    pub net_score: i64,
    pub like_count: usize,
    pub dislike_count: usize,
    pub author: AuthorBody,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Story> for StoryDetail {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            title: story.title,
            description: story.description,
            category: story.category,
            age_group: story.age_group,
            cover_image: story.cover_image,
            content: story.content.into_iter().map(PageBody::from).collect(),
            is_interactive: story.is_interactive,
            featured: story.featured,
            read_time_minutes: story.read_time_minutes,
            read_count: story.read_count,
            net_score: story.net_score,
            like_count: story.engagement.liked().len(),
            dislike_count: story.engagement.disliked().len(),
            author: AuthorBody {
                id: story.author.id,
                username: story.author.username,
            },
            tags: story.tags,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StoriesResponse {
    pub total: i64,
    pub stories: Vec<StorySummary>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub age_group: Option<String>,
    pub cover_image: Option<String>,
    pub is_interactive: Option<bool>,
    pub read_time_minutes: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize, IntoParams)]
pub struct FilterParams {
    pub category: Option<String>,
    pub age_group: Option<String>,
    /// Free-text match against title or description.
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

//=========================================================================================
// Parameter Validation Helpers
//=========================================================================================

fn page_params(
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<(i64, i64), (StatusCode, String)> {
    let limit = limit.unwrap_or(10);
    let offset = offset.unwrap_or(0);
    if !(1..=100).contains(&limit) {
        return Err((
            StatusCode::BAD_REQUEST,
            "limit must be between 1 and 100".to_string(),
        ));
    }
    if offset < 0 {
        return Err((StatusCode::BAD_REQUEST, "offset must not be negative".to_string()));
    }
    Ok((limit, offset))
}

fn parse_sort_key(raw: Option<&str>) -> Result<SortKey, (StatusCode, String)> {
    match raw {
        None | Some("created_at") => Ok(SortKey::CreatedAt),
        Some("net_score") => Ok(SortKey::NetScore),
        Some("read_count") => Ok(SortKey::ReadCount),
        Some(other) => Err((
            StatusCode::BAD_REQUEST,
            format!("unknown sort key '{}': expected created_at, net_score or read_count", other),
        )),
    }
}

fn parse_direction(raw: Option<&str>) -> Result<SortDirection, (StatusCode, String)> {
    match raw {
        None | Some("desc") => Ok(SortDirection::Desc),
        Some("asc") => Ok(SortDirection::Asc),
        Some(other) => Err((
            StatusCode::BAD_REQUEST,
            format!("unknown sort order '{}': expected asc or desc", other),
        )),
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

//=========================================================================================
// Listing Handlers
//=========================================================================================

/// List the most recently created stories.
#[utoipa::path(
    get,
    path = "/api/stories/new",
    params(ListParams),
    responses(
        (status = 200, description = "Newest stories", body = StoriesResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn new_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (limit, offset) = page_params(params.limit, params.offset)?;
    let listing = state
        .stories
        .list_stories(
            StoryFilter::default(),
            SortKey::CreatedAt,
            SortDirection::Desc,
            limit,
            offset,
        )
        .await
        .map_err(port_error)?;

    Ok(Json(StoriesResponse {
        total: listing.total,
        stories: listing.stories.into_iter().map(StorySummary::from).collect(),
    }))
}

/// List stories by net score, best first.
#[utoipa::path(
    get,
    path = "/api/stories/popular",
    params(ListParams),
    responses(
        (status = 200, description = "Most liked stories", body = StoriesResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn popular_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (limit, offset) = page_params(params.limit, params.offset)?;
    let listing = state
        .stories
        .list_stories(
            StoryFilter::default(),
            SortKey::NetScore,
            SortDirection::Desc,
            limit,
            offset,
        )
        .await
        .map_err(port_error)?;

    Ok(Json(StoriesResponse {
        total: listing.total,
        stories: listing.stories.into_iter().map(StorySummary::from).collect(),
    }))
}

/// List curated stories. The flag itself is set editorially, not over the API.
#[utoipa::path(
    get,
    path = "/api/stories/featured",
    params(ListParams),
    responses(
        (status = 200, description = "Curated stories", body = StoriesResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn featured_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (limit, offset) = page_params(params.limit, params.offset)?;
    let filter = StoryFilter {
        featured: Some(true),
        ..StoryFilter::default()
    };
    let listing = state
        .stories
        .list_stories(filter, SortKey::CreatedAt, SortDirection::Desc, limit, offset)
        .await
        .map_err(port_error)?;

    Ok(Json(StoriesResponse {
        total: listing.total,
        stories: listing.stories.into_iter().map(StorySummary::from).collect(),
    }))
}

/// Filtered, sorted story search.
#[utoipa::path(
    get,
    path = "/api/stories/filter",
    params(FilterParams),
    responses(
        (status = 200, description = "Stories matching the filter", body = StoriesResponse),
        (status = 400, description = "Invalid filter parameters"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn filter_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (limit, offset) = page_params(params.limit, params.offset)?;
    let sort_key = parse_sort_key(params.sort_by.as_deref())?;
    let direction = parse_direction(params.order.as_deref())?;

    let filter = StoryFilter {
        category: params.category,
        age_group: params.age_group,
        search: params.query,
        featured: None,
    };

    let listing = state
        .stories
        .list_stories(filter, sort_key, direction, limit, offset)
        .await
        .map_err(port_error)?;

    Ok(Json(StoriesResponse {
        total: listing.total,
        stories: listing.stories.into_iter().map(StorySummary::from).collect(),
    }))
}

//=========================================================================================
// Detail / CRUD Handlers
//=========================================================================================

/// Get one story. Every successful read increments the read counter.
#[utoipa::path(
    get,
    path = "/api/stories/{story_id}",
    params(("story_id" = Uuid, Path, description = "The story to read")),
    responses(
        (status = 200, description = "Story detail", body = StoryDetail),
        (status = 404, description = "No such story"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_story_handler(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let story = state
        .stories
        .record_read(story_id)
        .await
        .map_err(port_error)?;
    Ok(Json(StoryDetail::from(story)))
}

/// Create a new story from a multipart form.
///
/// Fields: `title`, `description`, `category` (required); `content` (a JSON
/// array of pages), `age_group`, `is_interactive`, `read_time_minutes`,
/// `tags` (comma-separated names), and an optional `image` file part for the
/// cover.
#[utoipa::path(
    post,
    path = "/api/stories",
    request_body(content_type = "multipart/form-data", description = "The story fields."),
    responses(
        (status = 201, description = "Story created", body = StoryDetail),
        (status = 400, description = "Invalid story payload"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut title = None;
    let mut description = None;
    let mut category = None;
    let mut age_group = "all".to_string();
    let mut content_blob = String::new();
    let mut is_interactive = true;
    let mut read_time_minutes = 5i32;
    let mut tags = Vec::new();
    let mut cover_upload: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read multipart data: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("cover.png").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("Failed to read file bytes: {}", e))
                })?;
                cover_upload = Some((filename, data));
            }
            _ => {
                let value = field.text().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("Failed to read field '{}': {}", name, e))
                })?;
                match name.as_str() {
                    "title" => title = Some(value),
                    "description" => description = Some(value),
                    "category" => category = Some(value),
                    "age_group" => age_group = value,
                    "content" => content_blob = value,
                    "is_interactive" => {
                        is_interactive = value.parse::<bool>().map_err(|_| {
                            (StatusCode::BAD_REQUEST, "is_interactive must be true or false".to_string())
                        })?;
                    }
                    "read_time_minutes" => {
                        read_time_minutes = value.parse::<i32>().map_err(|_| {
                            (StatusCode::BAD_REQUEST, "read_time_minutes must be a number".to_string())
                        })?;
                    }
                    "tags" => tags = split_tags(&value),
                    _ => {}
                }
            }
        }
    }

    let title = title.ok_or((StatusCode::BAD_REQUEST, "title is required".to_string()))?;
    let description =
        description.ok_or((StatusCode::BAD_REQUEST, "description is required".to_string()))?;
    let category =
        category.ok_or((StatusCode::BAD_REQUEST, "category is required".to_string()))?;

    // A malformed content field is caller error, not stored corruption.
    let content = deserialize_pages(&content_blob).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("content must be a JSON list of pages: {}", e),
        )
    })?;

    let cover_image = match cover_upload {
        Some((filename, data)) => Some(
            state
                .files
                .save_image(&data, &filename)
                .await
                .map_err(port_error)?,
        ),
        None => None,
    };

    let draft = StoryDraft {
        title,
        description,
        category,
        age_group,
        cover_image,
        content,
        is_interactive,
        read_time_minutes,
        tags,
    };

    let story = state
        .stories
        .create_story(user_id, draft)
        .await
        .map_err(port_error)?;

    Ok((StatusCode::CREATED, Json(StoryDetail::from(story))))
}

/// Update fields of an existing story. Author only.
#[utoipa::path(
    put,
    path = "/api/stories/{story_id}",
    params(("story_id" = Uuid, Path, description = "The story to update")),
    request_body = UpdateStoryRequest,
    responses(
        (status = 200, description = "Updated story", body = StoryDetail),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such story"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(story_id): Path<Uuid>,
    Json(req): Json<UpdateStoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let patch = StoryPatch {
        title: req.title,
        description: req.description,
        category: req.category,
        age_group: req.age_group,
        cover_image: req.cover_image,
        is_interactive: req.is_interactive,
        read_time_minutes: req.read_time_minutes,
    };

    let story = state
        .stories
        .update_story(story_id, user_id, patch)
        .await
        .map_err(port_error)?;
    Ok(Json(StoryDetail::from(story)))
}

/// Delete a story. Author only.
#[utoipa::path(
    delete,
    path = "/api/stories/{story_id}",
    params(("story_id" = Uuid, Path, description = "The story to delete")),
    responses(
        (status = 204, description = "Story deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such story"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn delete_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(story_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .stories
        .delete_story(story_id, user_id)
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Engagement Handlers
//=========================================================================================

/// Like a story. If already liked, removes the like. If disliked, switches.
#[utoipa::path(
    post,
    path = "/api/stories/{story_id}/like",
    params(("story_id" = Uuid, Path, description = "The story to like")),
    responses(
        (status = 200, description = "Updated story", body = StoryDetail),
        (status = 404, description = "No such story"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn like_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(story_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let story = state
        .stories
        .apply_vote(story_id, user_id, Vote::Like)
        .await
        .map_err(port_error)?;
    Ok(Json(StoryDetail::from(story)))
}

/// Dislike a story. If already disliked, removes the dislike. If liked, switches.
#[utoipa::path(
    post,
    path = "/api/stories/{story_id}/dislike",
    params(("story_id" = Uuid, Path, description = "The story to dislike")),
    responses(
        (status = 200, description = "Updated story", body = StoryDetail),
        (status = 404, description = "No such story"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn dislike_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(story_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let story = state
        .stories
        .apply_vote(story_id, user_id, Vote::Dislike)
        .await
        .map_err(port_error)?;
    Ok(Json(StoryDetail::from(story)))
}

//=========================================================================================
// Upload Handler
//=========================================================================================

/// Replace the cover image of a story. Author only.
#[utoipa::path(
    post,
    path = "/api/stories/{story_id}/cover",
    params(("story_id" = Uuid, Path, description = "The story to update")),
    request_body(content_type = "multipart/form-data", description = "The image file."),
    responses(
        (status = 200, description = "Updated story", body = StoryDetail),
        (status = 400, description = "Missing file or disallowed file type"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "No such story"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn upload_cover_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(story_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read multipart data: {}", e)))?
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        ))?;

    let filename = field.file_name().unwrap_or("cover.png").to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file bytes: {}", e)))?;

    let image_path = state
        .files
        .save_image(&data, &filename)
        .await
        .map_err(port_error)?;

    let story = state
        .stories
        .set_cover_image(story_id, user_id, &image_path)
        .await
        .map_err(port_error)?;
    Ok(Json(StoryDetail::from(story)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_default_and_clamp() {
        assert_eq!(page_params(None, None).unwrap(), (10, 0));
        assert_eq!(page_params(Some(100), Some(20)).unwrap(), (100, 20));
        assert!(page_params(Some(0), None).is_err());
        assert!(page_params(Some(101), None).is_err());
        assert!(page_params(None, Some(-1)).is_err());
    }

    #[test]
    fn sort_key_parsing_accepts_the_three_keys() {
        assert_eq!(parse_sort_key(None).unwrap(), SortKey::CreatedAt);
        assert_eq!(parse_sort_key(Some("created_at")).unwrap(), SortKey::CreatedAt);
        assert_eq!(parse_sort_key(Some("net_score")).unwrap(), SortKey::NetScore);
        assert_eq!(parse_sort_key(Some("read_count")).unwrap(), SortKey::ReadCount);
        assert!(parse_sort_key(Some("likes")).is_err());
    }

    #[test]
    fn direction_parsing_defaults_to_desc() {
        assert_eq!(parse_direction(None).unwrap(), SortDirection::Desc);
        assert_eq!(parse_direction(Some("asc")).unwrap(), SortDirection::Asc);
        assert!(parse_direction(Some("upward")).is_err());
    }

    #[test]
    fn tag_splitting_trims_and_drops_empties() {
        assert_eq!(
            split_tags(" forest, bravery ,,friendship"),
            vec!["forest", "bravery", "friendship"]
        );
        assert!(split_tags("").is_empty());
    }
}
