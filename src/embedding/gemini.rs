//! Google Gemini embeddings.

use super::{check_vectors, Embedder};
use crate::client::{api_key, create_http_client, send_json};
use crate::config::{EmbeddingSettings, ProviderSettings};
use crate::error::{Result, Stage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Generative Language API root.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";
const TASK_QUERY: &str = "RETRIEVAL_QUERY";

/// Gemini-based embedder.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    batch_delay: Duration,
    max_retries: usize,
}

impl GeminiEmbedder {
    /// Create an embedder from settings, reading `GOOGLE_API_KEY`.
    pub fn new(settings: &EmbeddingSettings, providers: &ProviderSettings) -> Result<Self> {
        Self::with_api_key(api_key("GOOGLE_API_KEY")?, settings, providers)
    }

    pub fn with_api_key(
        api_key: String,
        settings: &EmbeddingSettings,
        providers: &ProviderSettings,
    ) -> Result<Self> {
        Ok(Self {
            client: create_http_client(Duration::from_secs(providers.request_timeout_secs))?,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
            batch_size: settings.batch_size.max(1),
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            max_retries: providers.max_retries,
        })
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, self.model_path(), method)
    }

    fn request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedRequest<'a> {
        EmbedRequest {
            model: self.model_path(),
            content: Content {
                parts: vec![Part { text }],
            },
            task_type,
            output_dimensionality: self.dimensions,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = BatchRequest {
            requests: texts.iter().map(|t| self.request(t, TASK_DOCUMENT)).collect(),
        };
        let request = self
            .client
            .post(self.endpoint("batchEmbedContents"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response: BatchResponse =
            send_json(request, self.max_retries, Stage::Embedding, "Gemini batch embedding").await?;
        let vectors: Vec<Vec<f32>> = response.embeddings.into_iter().map(|e| e.values).collect();
        check_vectors(&vectors, texts.len(), self.dimensions)?;
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating document embeddings for {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            all_embeddings.extend(self.embed_batch(batch).await?);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    #[instrument(skip(self, text))]
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let request = self
            .client
            .post(self.endpoint("embedContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request(text, TASK_QUERY));

        let response: EmbedResponse =
            send_json(request, self.max_retries, Stage::Embedding, "Gemini query embedding").await?;
        let vectors = vec![response.embedding.values];
        check_vectors(&vectors, 1, self.dimensions)?;
        Ok(vectors.into_iter().next().unwrap_or_default())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Values,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
}

#[derive(Debug, Deserialize)]
struct Values {
    values: Vec<f32>,
}
