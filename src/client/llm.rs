//! [`GenerativeModel`] adapter over any edgequake-llm provider.
//!
//! Lets interpretation run on OpenAI, Anthropic, Ollama, Azure and the rest
//! of the providers edgequake-llm knows about, with keys read from the
//! environment the way that crate reads them.
//!
//! ## Message layout
//!
//! The request parts become a single user message: text parts are joined by
//! a blank line (so the behavior contract still opens the payload) and image
//! parts are attached as base64 `ImageData`. Chat providers have no audio
//! input, so audio parts are rejected.

use super::{GenerateResponse, GenerationOptions, GenerativeModel, Part};
use crate::error::ClientError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Wraps an `Arc<dyn LLMProvider>` as a [`GenerativeModel`].
pub struct LlmProviderModel {
    provider: Arc<dyn LLMProvider>,
    name: String,
}

impl LlmProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }

    /// Instantiate a named provider (e.g. `"openai"`) with the given model.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, ClientError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ClientError::NotConfigured {
                service: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, provider_name))
    }

    /// Let edgequake-llm pick the first provider whose API key is set.
    pub fn from_env() -> Result<Self, ClientError> {
        let (provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| ClientError::NotConfigured {
                service: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                    Error: {}",
                    e
                ),
            })?;
        Ok(Self::new(provider, "auto"))
    }
}

/// Split request parts into the joined user text and the attached images.
fn build_user_message(name: &str, parts: &[Part]) -> Result<(String, Vec<ImageData>), ClientError> {
    let mut texts = Vec::new();
    let mut images = Vec::new();

    for part in parts {
        match part {
            Part::Text { text } => texts.push(text.as_str()),
            Part::Image { mime_type, data } => {
                images.push(ImageData::new(STANDARD.encode(data), mime_type.as_str()));
            }
            Part::Audio { .. } => {
                return Err(ClientError::Unsupported {
                    service: name.to_string(),
                    detail: "chat providers do not accept audio input".to_string(),
                })
            }
        }
    }

    Ok((texts.join("\n\n"), images))
}

#[async_trait]
impl GenerativeModel for LlmProviderModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        parts: &[Part],
        options: &GenerationOptions,
    ) -> Result<GenerateResponse, ClientError> {
        let (text, images) = build_user_message(&self.name, parts)?;
        let messages = vec![ChatMessage::user_with_images(text, images)];

        let completion = CompletionOptions {
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&completion))
            .await
            .map_err(|e| ClientError::Request {
                service: self.name.clone(),
                detail: format!("{e}"),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        Ok(GenerateResponse {
            text: Some(response.content).filter(|t| !t.trim().is_empty()),
            input_tokens: Some(response.prompt_tokens as u64),
            output_tokens: Some(response.completion_tokens as u64),
        })
    }
}
