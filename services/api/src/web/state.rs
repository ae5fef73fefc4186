//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use storynest_core::ports::{
    FileStore, ImageGenerationService, StoryGenerationService, StoryStore, UserStore,
};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub stories: Arc<dyn StoryStore>,
    pub users: Arc<dyn UserStore>,
    pub files: Arc<dyn FileStore>,
    pub story_generator: Arc<dyn StoryGenerationService>,
    pub image_generator: Arc<dyn ImageGenerationService>,
    pub config: Arc<Config>,
}
