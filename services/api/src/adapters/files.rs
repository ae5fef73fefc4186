//! services/api/src/adapters/files.rs
//!
//! Local-filesystem implementation of the `FileStore` port. Uploaded images
//! are validated against an extension allow-list, stored under a fresh
//! uuid-based name, and referenced by the web path the router serves them on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use storynest_core::ports::{FileStore, PortError, PortResult};
use uuid::Uuid;

const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// The URL prefix generated references live under; `bin/api.rs` mounts the
/// uploads directory at the same path.
pub const UPLOADS_WEB_PATH: &str = "/uploads/images";

#[derive(Clone)]
pub struct LocalFileStore {
    uploads_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(uploads_dir: PathBuf) -> Self {
        Self { uploads_dir }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }
}

/// Returns the lowercased extension of `filename` when it is on the
/// allow-list, or `None` for anything else.
pub fn allowed_image_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_lowercase();
    ALLOWED_IMAGE_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save_image(&self, bytes: &[u8], declared_filename: &str) -> PortResult<String> {
        let extension = allowed_image_extension(declared_filename).ok_or_else(|| {
            PortError::InvalidInput(format!(
                "Invalid file type. Allowed types: {}",
                ALLOWED_IMAGE_EXTENSIONS.join(", ")
            ))
        })?;

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Fresh name per upload to prevent collisions.
        let unique_filename = format!("{}.{}", Uuid::new_v4(), extension);
        let file_path = self.uploads_dir.join(&unique_filename);
        tokio::fs::write(&file_path, bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(format!("{}/{}", UPLOADS_WEB_PATH, unique_filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allow_listed_extensions_case_insensitively() {
        assert_eq!(allowed_image_extension("cover.png").as_deref(), Some("png"));
        assert_eq!(allowed_image_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(
            allowed_image_extension("art.final.webp").as_deref(),
            Some("webp")
        );
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(allowed_image_extension("script.exe"), None);
        assert_eq!(allowed_image_extension("notes.txt"), None);
        assert_eq!(allowed_image_extension("no_extension"), None);
        assert_eq!(allowed_image_extension(""), None);
    }

    #[tokio::test]
    async fn saves_bytes_under_a_fresh_name() {
        let dir = std::env::temp_dir().join(format!("storynest-test-{}", Uuid::new_v4()));
        let store = LocalFileStore::new(dir.clone());

        let path = store.save_image(b"fake png bytes", "cover.png").await.unwrap();
        assert!(path.starts_with(UPLOADS_WEB_PATH));
        assert!(path.ends_with(".png"));

        let stored_name = path.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(dir.join(stored_name)).await.unwrap();
        assert_eq!(on_disk, b"fake png bytes");

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_disallowed_uploads_before_touching_disk() {
        let dir = std::env::temp_dir().join(format!("storynest-test-{}", Uuid::new_v4()));
        let store = LocalFileStore::new(dir.clone());

        let result = store.save_image(b"payload", "malware.exe").await;
        assert!(matches!(result, Err(PortError::InvalidInput(_))));
        assert!(!dir.exists());
    }
}
