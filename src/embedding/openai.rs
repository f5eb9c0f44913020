//! OpenAI embeddings implementation.

use super::{check_vectors, Embedder};
use crate::client::create_openai_client;
use crate::config::{EmbeddingSettings, ProviderSettings};
use crate::error::{PitwallError, Result, Stage};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI accepts at most this many inputs per request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder. Documents and queries use the same call.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings. The key is read from `OPENAI_API_KEY`.
    pub fn new(settings: &EmbeddingSettings, providers: &ProviderSettings) -> Result<Self> {
        Ok(Self {
            client: create_openai_client(Duration::from_secs(providers.request_timeout_secs))?,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| {
                    PitwallError::unavailable(Stage::Embedding, format!("Failed to build request: {}", e))
                })?;

            let response = self.client.embeddings().create(request).await.map_err(|e| {
                PitwallError::unavailable(Stage::Embedding, format!("Embedding API error: {}", e))
            })?;

            // Sort by index to ensure correct order
            let mut data = response.data;
            data.sort_by_key(|e| e.index);
            let vectors: Vec<Vec<f32>> = data.into_iter().map(|e| e.embedding).collect();
            check_vectors(&vectors, chunk.len(), self.dimensions)?;
            all_embeddings.extend(vectors);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    #[instrument(skip(self, text))]
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_document(text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
