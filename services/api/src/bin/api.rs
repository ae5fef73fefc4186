//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{LocalFileStore, OpenAiImageAdapter, OpenAiStoryAdapter, PgStore},
    config::Config,
    error::ApiError,
    web::{
        ai::generate_story_handler,
        auth::{login_handler, logout_handler, signup_handler},
        middleware::require_auth,
        state::AppState,
        stories::{
            create_story_handler, delete_story_handler, dislike_story_handler,
            featured_stories_handler, filter_stories_handler, get_story_handler,
            like_story_handler, new_stories_handler, popular_stories_handler,
            update_story_handler, upload_cover_handler,
        },
        ApiDoc,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_config = OpenAIConfig::new().with_api_key(&openai_api_key);
    let openai_client = Client::with_config(openai_config);

    let story_adapter = Arc::new(OpenAiStoryAdapter::new(
        openai_client.clone(),
        config.story_model.clone(),
    ));
    let image_adapter = Arc::new(OpenAiImageAdapter::new(
        reqwest::Client::new(),
        config.image_api_base.clone(),
        openai_api_key,
        config.image_model.clone(),
    ));
    let file_store = Arc::new(LocalFileStore::new(config.uploads_dir.clone()));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        stories: store.clone(),
        users: store,
        files: file_store.clone(),
        story_generator: story_adapter,
        image_generator: image_adapter,
        config: config.clone(),
    });

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/stories/new", get(new_stories_handler))
        .route("/api/stories/popular", get(popular_stories_handler))
        .route("/api/stories/featured", get(featured_stories_handler))
        .route("/api/stories/filter", get(filter_stories_handler))
        .route("/api/stories", post(create_story_handler))
        .route(
            "/api/stories/{story_id}",
            get(get_story_handler)
                .put(update_story_handler)
                .delete(delete_story_handler),
        )
        .route("/api/stories/{story_id}/like", post(like_story_handler))
        .route("/api/stories/{story_id}/dislike", post(dislike_story_handler))
        .route("/api/stories/{story_id}/cover", post(upload_cover_handler))
        .route("/api/stories/ai-generate", post(generate_story_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(
            "/uploads/images",
            ServeDir::new(file_store.uploads_dir()),
        )
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
