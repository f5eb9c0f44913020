//! Configuration settings for Pitwall.

use crate::error::{PitwallError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub vector_store: VectorStoreSettings,
    pub pinecone: PineconeSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub providers: ProviderSettings,
    pub ingestion: IngestionSettings,
    pub live_data: LiveDataSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Hosted model vendor backing the embedding or generation capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Google Generative Language API.
    #[default]
    Gemini,
    /// OpenAI API.
    OpenAI,
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ModelProvider::Gemini),
            "openai" => Ok(ModelProvider::OpenAI),
            _ => Err(format!("Unknown model provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelProvider::Gemini => write!(f, "gemini"),
            ModelProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: ModelProvider,
    pub model: String,
    /// Output dimensionality; every stored vector has exactly this length.
    pub dimensions: u32,
    /// Texts per document-embedding request.
    pub batch_size: usize,
    /// Pause between document batches, to stay under rate limits.
    pub batch_delay_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Gemini,
            model: "gemini-embedding-001".to_string(),
            dimensions: 768,
            batch_size: 20,
            batch_delay_ms: 0,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ModelProvider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Hosted Pinecone index.
    #[default]
    Pinecone,
    /// Local SQLite file.
    Sqlite,
    /// Process memory; nothing survives a restart.
    Memory,
}

impl FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
    /// Path to the SQLite database (sqlite provider only).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Pinecone,
            sqlite_path: "~/.pitwall/vectors.db".to_string(),
        }
    }
}

/// Pinecone index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    pub index_name: String,
    /// Data-plane host. Resolved through the control plane when unset.
    pub index_host: Option<String>,
    pub control_plane_url: String,
    pub cloud: String,
    pub region: String,
    /// Create a serverless cosine index when the named index does not exist.
    pub create_if_missing: bool,
    pub upsert_batch_size: usize,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            index_name: "f1-knowledge-base".to_string(),
            index_host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            create_if_missing: true,
            upsert_batch_size: 100,
        }
    }
}

/// Text chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Default number of results when a request does not say.
    pub top_k: usize,
    /// Largest `top_k` a request may ask for.
    pub max_top_k: usize,
    /// Results scoring below this cosine similarity are discarded.
    pub similarity_threshold: f32,
    /// Per-chunk character cap inside the prompt.
    pub max_context_chars: usize,
    /// Length of the excerpt returned with each source.
    pub excerpt_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 15,
            similarity_threshold: 0.70,
            max_context_chars: 1500,
            excerpt_chars: 300,
        }
    }
}

/// Settings shared by every outbound provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub request_timeout_secs: u64,
    /// Attempts per HTTP request on 429/5xx or transport errors.
    pub max_retries: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Whether `POST /ingest` is served. Off in production.
    pub api_enabled: bool,
    pub scrape_delay_ms: u64,
    pub scrape_retries: usize,
    pub wikipedia_api_url: String,
    pub ergast_base_url: String,
    pub ergast_years: Vec<u16>,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            api_enabled: false,
            scrape_delay_ms: 1000,
            scrape_retries: 3,
            wikipedia_api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            ergast_base_url: "https://api.jolpi.ca/ergast/f1".to_string(),
            ergast_years: vec![2020, 2021, 2022, 2023, 2024, 2025],
        }
    }
}

/// Live session data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveDataSettings {
    pub enabled: bool,
    pub openf1_base_url: String,
    pub timeout_secs: u64,
}

impl Default for LiveDataSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            openf1_base_url: "https://api.openf1.org/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Comma-separated list of allowed origins, or "*".
    pub cors_origins: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: "http://localhost:3000,https://localhost:3000".to_string(),
        }
    }
}

impl ServerSettings {
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory holding `rag.toml` / `direct.toml` overrides.
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file, then the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path (or the default location), then apply
    /// environment overrides and validate.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| PitwallError::InvalidConfiguration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pitwall")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Overlay environment variables onto the loaded settings.
    ///
    /// `lookup` abstracts the environment so tests don't touch process state.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PINECONE_INDEX_NAME") {
            self.pinecone.index_name = v;
        }
        if let Some(v) = get("PINECONE_INDEX_HOST") {
            self.pinecone.index_host = Some(v);
        }
        if let Some(v) = get("PINECONE_CLOUD") {
            self.pinecone.cloud = v;
        }
        if let Some(v) = get("PINECONE_REGION") {
            self.pinecone.region = v;
        }
        if let Some(v) = parse_var(&get, "EMBEDDING_PROVIDER")? {
            self.embedding.provider = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = parse_var(&get, "EMBEDDING_DIMENSION")? {
            self.embedding.dimensions = v;
        }
        if let Some(v) = parse_var(&get, "LLM_PROVIDER")? {
            self.llm.provider = v;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = parse_var(&get, "LLM_TEMPERATURE")? {
            self.llm.temperature = v;
        }
        if let Some(v) = parse_var(&get, "MAX_TOKENS")? {
            self.llm.max_tokens = v;
        }
        if let Some(v) = parse_var(&get, "VECTOR_STORE_PROVIDER")? {
            self.vector_store.provider = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_SIZE")? {
            self.chunking.chunk_size = v;
        }
        if let Some(v) = parse_var(&get, "CHUNK_OVERLAP")? {
            self.chunking.chunk_overlap = v;
        }
        if let Some(v) = parse_var(&get, "TOP_K_RESULTS")? {
            self.retrieval.top_k = v;
        }
        if let Some(v) = parse_var(&get, "MAX_TOP_K")? {
            self.retrieval.max_top_k = v;
        }
        if let Some(v) = parse_var(&get, "SIMILARITY_THRESHOLD")? {
            self.retrieval.similarity_threshold = v;
        }
        if let Some(v) = parse_var(&get, "REQUEST_TIMEOUT_SECS")? {
            self.providers.request_timeout_secs = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.general.log_level = v.to_lowercase();
        }
        if let Some(v) = get("CORS_ORIGINS") {
            self.server.cors_origins = v;
        }
        if let Some(v) = parse_var(&get, "INGESTION_API_ENABLED")? {
            self.ingestion.api_enabled = v;
        }
        if let Some(v) = get("ERGAST_BASE_URL") {
            self.ingestion.ergast_base_url = v;
        }
        if let Some(v) = get("OPENF1_BASE_URL") {
            self.live_data.openf1_base_url = v;
        }
        if let Some(v) = parse_var(&get, "SCRAPE_DELAY_MS")? {
            self.ingestion.scrape_delay_ms = v;
        }
        if let Some(v) = parse_var(&get, "SCRAPE_RETRIES")? {
            self.ingestion.scrape_retries = v;
        }

        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PitwallError::InvalidConfiguration(msg));

        if self.chunking.chunk_size == 0 || self.chunking.chunk_overlap == 0 {
            return invalid("chunk_size and chunk_overlap must be positive".to_string());
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return invalid(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return invalid(format!(
                "similarity_threshold {} is outside [-1, 1]",
                self.retrieval.similarity_threshold
            ));
        }
        if self.retrieval.max_top_k == 0 {
            return invalid("max_top_k must be at least 1".to_string());
        }
        if self.retrieval.top_k == 0 || self.retrieval.top_k > self.retrieval.max_top_k {
            return invalid(format!(
                "top_k {} must be within 1..={}",
                self.retrieval.top_k, self.retrieval.max_top_k
            ));
        }
        if self.embedding.dimensions == 0 {
            return invalid("embedding dimensions must be positive".to_string());
        }
        if self.embedding.batch_size == 0 {
            return invalid("embedding batch_size must be positive".to_string());
        }
        if self.providers.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            PitwallError::InvalidConfiguration(format!("{}={:?}: {}", key, raw, e))
        }),
        None => Ok(None),
    }
}
