//! services/api/src/web/ai.rs
//!
//! The AI story generation endpoint. Text generation must succeed; every
//! image is best-effort on top of it - a page whose illustration could not
//! be rendered simply ships without one, and its prompt never leaves this
//! handler either way.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use storynest_core::content::Page;
use storynest_core::domain::StoryDraft;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::port_error;
use crate::web::state::AppState;
use crate::web::stories::StoryDetail;

#[derive(Deserialize, ToSchema)]
pub struct AiStoryRequest {
    pub user_prompt: String,
    pub category: String,
}

/// Renders one illustration and stores it, returning the stored web path.
/// Any failure is logged and swallowed: absence of an image is a valid
/// terminal outcome, not an error.
async fn render_and_store(state: &AppState, prompt: &str) -> Option<String> {
    let bytes = match state.image_generator.render_image(prompt).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Image generation failed for prompt '{}': {}", prompt, e);
            return None;
        }
    };
    match state.files.save_image(&bytes, "generated.png").await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Failed to store generated image for prompt '{}': {}", prompt, e);
            None
        }
    }
}

/// Generate and persist a new story from a prompt and category.
#[utoipa::path(
    post,
    path = "/api/stories/ai-generate",
    request_body = AiStoryRequest,
    responses(
        (status = 201, description = "Story generated and saved", body = StoryDetail),
        (status = 400, description = "Empty prompt or category"),
        (status = 502, description = "The AI service failed"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn generate_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AiStoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.user_prompt.trim().is_empty() || req.category.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "user_prompt and category are required".to_string(),
        ));
    }

    info!(
        "Generating AI story for category '{}', prompt: '{}'",
        req.category, req.user_prompt
    );
    let mut generated = state
        .story_generator
        .generate_story(&req.user_prompt, &req.category)
        .await
        .map_err(port_error)?;

    // `take` clears each prompt after its one generation attempt, so prompts
    // never reach the persisted story regardless of success.
    let cover_image = match generated.cover_image_prompt.take() {
        Some(prompt) => render_and_store(&state, &prompt).await,
        None => None,
    };

    let mut content = Vec::with_capacity(generated.pages.len());
    for mut page in generated.pages {
        let image = match page.image_prompt.take() {
            Some(prompt) => render_and_store(&state, &prompt).await,
            None => None,
        };
        content.push(Page {
            text: Some(page.text),
            image,
        });
    }

    let draft = StoryDraft {
        title: generated.title,
        description: generated.description,
        // The category comes from the caller, not the model.
        category: req.category,
        age_group: generated.age_group,
        cover_image,
        content,
        is_interactive: true,
        read_time_minutes: 5,
        tags: generated.tags,
    };

    let story = state
        .stories
        .create_story(user_id, draft)
        .await
        .map_err(port_error)?;

    Ok((StatusCode::CREATED, Json(StoryDetail::from(story))))
}
