//! Provider wiring for Pitwall.
//!
//! Every provider handle is built once from settings here and shared by the
//! chain, the ingestion pipeline and the server.

use crate::chunking::ChunkingConfig;
use crate::client::create_http_client;
use crate::config::{ModelProvider, Prompts, Settings, VectorStoreProvider};
use crate::embedding::{Embedder, GeminiEmbedder, OpenAIEmbedder};
use crate::error::Result;
use crate::evaluation::{run_evaluation, EvaluationReport, EVALUATION_DATASET};
use crate::ingest::IngestionPipeline;
use crate::llm::{GeminiLlm, LlmProvider, OpenAILlm};
use crate::rag::{LiveDataSource, OpenF1Client, RagChain, StatusConfig};
use crate::vector_store::{MemoryVectorStore, PineconeStore, SqliteVectorStore, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Owns the provider handles for the lifetime of the process.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LlmProvider>,
    vector_store: Arc<dyn VectorStore>,
    live: Option<Arc<dyn LiveDataSource>>,
    http: reqwest::Client,
}

impl Orchestrator {
    /// Build every provider the settings select.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let embedder = create_embedder(&settings)?;
        let llm = create_llm(&settings)?;
        let vector_store = create_vector_store(&settings)?;

        let mut orchestrator = Self::with_components(settings, embedder, llm, vector_store)?;
        if orchestrator.settings.live_data.enabled {
            let live = OpenF1Client::new(
                &orchestrator.settings.live_data,
                &orchestrator.settings.providers,
            )?;
            orchestrator.live = Some(Arc::new(live));
        }
        Ok(orchestrator)
    }

    /// Assemble an orchestrator from ready-made providers. Live data is off.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let http = create_http_client(call_timeout(&settings))?;

        Ok(Self {
            settings,
            prompts,
            embedder,
            llm,
            vector_store,
            live: None,
            http,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn llm(&self) -> Arc<dyn LlmProvider> {
        self.llm.clone()
    }

    /// A question-answering chain over the shared providers.
    pub fn rag_chain(&self) -> RagChain {
        let mut chain = RagChain::new(
            self.embedder.clone(),
            self.vector_store.clone(),
            self.llm.clone(),
            self.settings.retrieval.clone(),
        )
        .with_prompts(self.prompts.clone())
        .with_call_timeout(call_timeout(&self.settings))
        .with_status_config(StatusConfig::from_settings(&self.settings));

        if let Some(live) = &self.live {
            chain = chain.with_live_data(live.clone());
        }
        chain
    }

    /// An ingestion pipeline writing to the shared store.
    pub fn ingestion_pipeline(&self) -> Result<IngestionPipeline> {
        Ok(IngestionPipeline::new(
            self.embedder.clone(),
            self.vector_store.clone(),
            ChunkingConfig::from_settings(&self.settings.chunking)?,
            self.settings.ingestion.clone(),
            self.http.clone(),
        ))
    }

    /// Run the reference question set.
    pub async fn evaluate(&self) -> EvaluationReport {
        run_evaluation(&self.rag_chain(), EVALUATION_DATASET).await
    }
}

fn call_timeout(settings: &Settings) -> Duration {
    Duration::from_secs(settings.providers.request_timeout_secs)
}

fn create_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    info!(
        "Using {} embeddings ({}, {} dimensions)",
        settings.embedding.provider, settings.embedding.model, settings.embedding.dimensions
    );
    Ok(match settings.embedding.provider {
        ModelProvider::Gemini => Arc::new(GeminiEmbedder::new(
            &settings.embedding,
            &settings.providers,
        )?),
        ModelProvider::OpenAI => Arc::new(OpenAIEmbedder::new(
            &settings.embedding,
            &settings.providers,
        )?),
    })
}

fn create_llm(settings: &Settings) -> Result<Arc<dyn LlmProvider>> {
    info!("Using {} LLM ({})", settings.llm.provider, settings.llm.model);
    Ok(match settings.llm.provider {
        ModelProvider::Gemini => Arc::new(GeminiLlm::new(&settings.llm, &settings.providers)?),
        ModelProvider::OpenAI => Arc::new(OpenAILlm::new(&settings.llm, &settings.providers)?),
    })
}

/// Open the configured vector store on its own.
pub fn create_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    info!("Using {} vector store", settings.vector_store.provider);
    Ok(match settings.vector_store.provider {
        VectorStoreProvider::Pinecone => Arc::new(PineconeStore::new(
            &settings.pinecone,
            settings.embedding.dimensions as usize,
            &settings.providers,
        )?),
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
    })
}
