//! services/api/src/adapters/image_llm.rs
//!
//! This module contains the adapter for the illustration model.
//! It implements the `ImageGenerationService` port from the `core` crate by
//! calling an OpenAI-compatible image generation endpoint over plain HTTP and
//! decoding the base64 payload it returns.

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use storynest_core::ports::{ImageGenerationService, PortError, PortResult};

/// An adapter that implements `ImageGenerationService` against an
/// OpenAI-compatible `/images/generations` endpoint.
#[derive(Clone)]
pub struct OpenAiImageAdapter {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiImageAdapter {
    /// Creates a new `OpenAiImageAdapter`.
    pub fn new(http: reqwest::Client, api_base: String, api_key: String, model: String) -> Self {
        Self {
            http,
            api_base,
            api_key,
            model,
        }
    }
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImagePayload>,
}

#[derive(Deserialize)]
struct ImagePayload {
    b64_json: Option<String>,
}

#[async_trait]
impl ImageGenerationService for OpenAiImageAdapter {
    async fn render_image(&self, prompt: &str) -> PortResult<Vec<u8>> {
        let body = json!({
            "model": self.model,
            "prompt": format!(
                "Create a child-friendly illustration of: {}. Make it colorful and detailed.",
                prompt
            ),
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });

        let response = self
            .http
            .post(format!("{}/images/generations", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::External(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::External(format!(
                "image generation returned {}: {}",
                status, detail
            )));
        }

        let payload: ImagesResponse = response
            .json()
            .await
            .map_err(|e| PortError::External(e.to_string()))?;

        let b64 = payload
            .data
            .into_iter()
            .next()
            .and_then(|image| image.b64_json)
            .ok_or_else(|| {
                PortError::External("image generation returned no image data".to_string())
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| PortError::External(format!("image payload was not valid base64: {e}")))
    }
}
