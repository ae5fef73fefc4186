//! services/api/src/adapters/story_llm.rs
//!
//! This module contains the adapter for the story-writing LLM.
//! It implements the `StoryGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use storynest_core::domain::GeneratedStory;
use storynest_core::ports::{PortError, PortResult, StoryGenerationService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `StoryGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiStoryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiStoryAdapter {
    /// Creates a new `OpenAiStoryAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

const SYSTEM_PROMPT: &str = "You are a children's story writer. You MUST respond with a single \
JSON object and nothing else - no prose, no markdown fences. The object has this exact shape: \
{\"title\": \"a catchy title, 2-3 words\", \
\"description\": \"a one-sentence lesson or moral of the story\", \
\"age_group\": \"one of '3-6', '7-10', 'all', '13+'\", \
\"cover_image_prompt\": \"a short ENGLISH prompt for a cover illustration of the whole story\", \
\"pages\": [{\"text\": \"1-2 very short, simple sentences for this page\", \
\"image_prompt\": \"a short ENGLISH prompt for this page's illustration, or null\"}], \
\"tags\": [\"two or three topical tags\"]}. \
Write 3 to 6 pages. The story must be suitable for children: simple language, a positive \
message, and no graphic or violent scenes.";

//=========================================================================================
// `StoryGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl StoryGenerationService for OpenAiStoryAdapter {
    /// Generates a structured story draft from a user prompt and category.
    async fn generate_story(
        &self,
        user_prompt: &str,
        category: &str,
    ) -> PortResult<GeneratedStory> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Write a story for the category '{}' based on this idea:\n\n{}",
                    category, user_prompt
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::External(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::External("Story generation LLM returned no text content.".to_string())
            })?;

        parse_generated_story(&content)
    }
}

/// Parses the model's reply into a `GeneratedStory`, tolerating a markdown
/// code fence around the JSON but nothing else.
pub fn parse_generated_story(raw: &str) -> PortResult<GeneratedStory> {
    let body = strip_code_fence(raw.trim());
    let story: GeneratedStory = serde_json::from_str(body).map_err(|e| {
        PortError::External(format!("AI response did not match the expected structure: {e}"))
    })?;
    if story.pages.is_empty() {
        return Err(PortError::External(
            "AI response contained no story pages".to_string(),
        ));
    }
    Ok(story)
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(inner) = raw.strip_prefix("```") else {
        return raw;
    };
    // Drop the language hint on the opening fence line, then the closing fence.
    let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "title": "The Brave Rabbit",
        "description": "Always be kind to others.",
        "age_group": "3-6",
        "cover_image_prompt": "a brave rabbit looking at a castle on a hill",
        "pages": [
            {"text": "Once there was a rabbit.", "image_prompt": "a rabbit on a hill"},
            {"text": "The rabbit helped a lost bird home."}
        ],
        "tags": ["forest", "bravery"]
    }"#;

    #[test]
    fn parses_a_plain_json_reply() {
        let story = parse_generated_story(REPLY).unwrap();
        assert_eq!(story.title, "The Brave Rabbit");
        assert_eq!(story.pages.len(), 2);
        assert_eq!(
            story.pages[0].image_prompt.as_deref(),
            Some("a rabbit on a hill")
        );
        assert!(story.pages[1].image_prompt.is_none());
        assert_eq!(story.tags, vec!["forest", "bravery"]);
    }

    #[test]
    fn tolerates_a_markdown_code_fence() {
        let fenced = format!("```json\n{REPLY}\n```");
        let story = parse_generated_story(&fenced).unwrap();
        assert_eq!(story.pages.len(), 2);
    }

    #[test]
    fn rejects_non_json_replies() {
        let result = parse_generated_story("Once upon a time...");
        assert!(matches!(result, Err(PortError::External(_))));
    }

    #[test]
    fn rejects_a_story_without_pages() {
        let empty = r#"{"title": "t", "description": "d", "age_group": "all",
                        "pages": [], "tags": []}"#;
        assert!(matches!(
            parse_generated_story(empty),
            Err(PortError::External(_))
        ));
    }
}
