//! OpenAI chat completions.

use super::{estimate_tokens, Generation, LlmProvider};
use crate::client::create_openai_client;
use crate::config::{LlmSettings, ProviderSettings};
use crate::error::{PitwallError, Result, Stage};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// OpenAI-based generator.
pub struct OpenAILlm {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAILlm {
    /// Create a generator from settings. The key is read from `OPENAI_API_KEY`.
    pub fn new(settings: &LlmSettings, providers: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            client: create_openai_client(Duration::from_secs(providers.request_timeout_secs))?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

fn generation_error(e: impl std::fmt::Display) -> PitwallError {
    PitwallError::unavailable(Stage::Generation, e.to_string())
}

#[async_trait]
impl LlmProvider for OpenAILlm {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let started = Instant::now();

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(generation_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(generation_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            PitwallError::unavailable(Stage::Generation, format!("Failed to generate response: {}", e))
        })?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| generation_error("Empty response from LLM"))?;

        let tokens_used = response
            .usage
            .map(|u| u.total_tokens)
            .unwrap_or_else(|| estimate_tokens(prompt, &text));

        debug!(tokens_used, "Generated {} chars", text.len());
        Ok(Generation {
            text,
            tokens_used,
            latency: started.elapsed(),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_creation() {
        let settings = LlmSettings {
            model: "gpt-4o-mini".to_string(),
            ..LlmSettings::default()
        };
        let llm = OpenAILlm::new(&settings, &ProviderSettings::default()).unwrap();
        assert_eq!(llm.model(), "gpt-4o-mini");
    }
}
