//! Google Gemini text generation.

use super::{estimate_tokens, Generation, LlmProvider};
use crate::client::{api_key, create_http_client, send_json};
use crate::config::{LlmSettings, ProviderSettings};
use crate::embedding::GEMINI_API_BASE;
use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Gemini-based generator.
pub struct GeminiLlm {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: usize,
}

impl GeminiLlm {
    /// Create a generator from settings, reading `GOOGLE_API_KEY`.
    pub fn new(settings: &LlmSettings, providers: &ProviderSettings) -> Result<Self> {
        Self::with_api_key(api_key("GOOGLE_API_KEY")?, settings, providers)
    }

    pub fn with_api_key(
        api_key: String,
        settings: &LlmSettings,
        providers: &ProviderSettings,
    ) -> Result<Self> {
        Ok(Self {
            client: create_http_client(Duration::from_secs(providers.request_timeout_secs))?,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_retries: providers.max_retries,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let started = Instant::now();
        let request = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(prompt));

        let response: GenerateResponse =
            send_json(request, self.max_retries, Stage::Generation, "Gemini generation").await?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(PitwallError::unavailable(
                Stage::Generation,
                "Empty response from LLM",
            ));
        }

        let tokens_used = response
            .usage_metadata
            .and_then(|u| u.total_token_count)
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, joined.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}
