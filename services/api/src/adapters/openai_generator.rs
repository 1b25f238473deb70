//! services/api/src/adapters/openai_generator.rs
//!
//! This module contains the adapter for the prompt-restructuring LLM.
//! It implements the `PromptGenerationService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = r#"You are a prompt engineer. The user gives you a rough idea. Rewrite it as a clear, reusable prompt they can paste into any AI chat assistant.

The prompt must cover, in this order:
- Role: who the assistant should act as.
- Context: the background the assistant needs.
- Task: exactly what to produce.
- Constraints: rules, limits, tone, and things to avoid.
- Output Format: how the answer should be structured.

If important details are missing, make sensible assumptions in the prompt and ask at most 2 short clarifying questions.

Respond with ONLY a JSON object, no markdown, in this shape:
{"prompt": "<the full prompt as plain text>", "follow_up_questions": ["<question>", "<question>"]}"#;

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
use promptsmith_core::ports::{GenerationFailure, PromptGenerationService};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Status reported when the provider rejects a call; the real HTTP status is not exposed.
const PROVIDER_REJECTED_STATUS: u16 = 502;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PromptGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGeneratorAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGeneratorAdapter {
    /// Creates a new `OpenAiGeneratorAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Reads the model's message content as JSON. Markdown code fences are removed
/// first; anything that still is not JSON is passed on as a plain string.
pub fn parse_model_content(content: &str) -> Value {
    let trimmed = content.trim();
    let unfenced = strip_code_fence(trimmed);
    serde_json::from_str(unfenced).unwrap_or_else(|_| Value::String(unfenced.to_string()))
}

/// A whole-message markdown fence, with an optional language tag.
static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").ok());

fn strip_code_fence(text: &str) -> &str {
    let Some(fence) = CODE_FENCE.as_ref() else {
        return text;
    };
    fence
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn failure_from(e: OpenAIError) -> GenerationFailure {
    match e {
        OpenAIError::ApiError(api) => GenerationFailure::Rejected {
            status: PROVIDER_REJECTED_STATUS,
            message: Some(api.message),
        },
        other => GenerationFailure::Transport(other.to_string()),
    }
}

//=========================================================================================
// `PromptGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PromptGenerationService for OpenAiGeneratorAdapter {
    /// Asks the model to restructure the user's idea and returns its JSON answer.
    async fn generate(&self, input: &str) -> Result<Value, GenerationFailure> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(failure_from)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("IDEA:\n{}", input))
                .build()
                .map_err(failure_from)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.4)
            .build()
            .map_err(failure_from)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(failure_from)?;

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationFailure::Transport(
                    "Generation LLM response contained no text content.".to_string(),
                )
            })?;
        debug!("Model returned {} characters.", content.len());

        Ok(parse_model_content(&content))
    }
}
