pub mod db;
pub mod files;
pub mod image_llm;
pub mod story_llm;

pub use db::PgStore;
pub use files::LocalFileStore;
pub use image_llm::OpenAiImageAdapter;
pub use story_llm::OpenAiStoryAdapter;
