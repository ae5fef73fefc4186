pub mod ai;
pub mod auth;
pub mod middleware;
pub mod state;
pub mod stories;

pub use middleware::require_auth;

use axum::http::StatusCode;
use storynest_core::ports::PortError;
use tracing::error;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        stories::new_stories_handler,
        stories::popular_stories_handler,
        stories::featured_stories_handler,
        stories::filter_stories_handler,
        stories::get_story_handler,
        stories::create_story_handler,
        stories::update_story_handler,
        stories::delete_story_handler,
        stories::like_story_handler,
        stories::dislike_story_handler,
        stories::upload_cover_handler,
        ai::generate_story_handler,
    ),
    components(schemas(
        auth::SignupRequest,
        auth::LoginRequest,
        auth::AuthResponse,
        stories::PageBody,
        stories::AuthorBody,
        stories::StorySummary,
        stories::StoryDetail,
        stories::StoriesResponse,
        stories::UpdateStoryRequest,
        ai::AiStoryRequest,
    )),
    tags(
        (name = "storynest API", description = "API endpoints for the children's story platform.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Port Error Translation
//=========================================================================================

/// Translates a `PortError` into the HTTP response pair the handlers return.
/// Server-side failures are logged here and surfaced with generic messages.
pub(crate) fn port_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Corrupt(err) => {
            error!("Malformed persisted story content: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stored story content is malformed".to_string(),
            )
        }
        PortError::External(msg) => {
            error!("Upstream AI service failure: {}", msg);
            (
                StatusCode::BAD_GATEWAY,
                "The AI service failed to produce a story".to_string(),
            )
        }
        PortError::Unexpected(msg) => {
            error!("Unexpected service error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}
